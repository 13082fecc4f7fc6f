//! One-shot inference.
//!
//! The fundamental single-call operation: prompt in, text out. Narrow
//! extraction passes (pulling a menu item name out of an utterance) are
//! built on this rather than on a full session.

use crate::error::ModelError;
use async_trait::async_trait;

/// A request for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// The prompt to complete.
    pub prompt: String,
    /// System prompt, if any.
    pub system: Option<String>,
    /// Temperature for sampling.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    /// Creates a request with just a prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Adds a system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A single completion.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// The generated text.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A backend capable of one-shot inference.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generates a completion for the given request.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
