//! Assistant configuration.
//!
//! Strongly-typed configuration for the hosting process, loaded via the
//! `config` crate from environment variables (`MODEL__API_KEY`,
//! `CATALOG__ACCESS_TOKEN`, and so on).

use copper_ticket_ai::GeminiConfig;
use copper_ticket_catalog::SquareCatalogConfig;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::fmt;

/// System instruction for the conversational model. Asks for
/// well-structured markup as the textual response format.
pub const ASSISTANT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant for restaurant menu management.
Return every answer as valid, well-structured Markdown focused on
readability: headings to organize content, bullet or numbered lists for
enumerations, tables for tabular data, and links embedded as
[link text](URL). When a menu item has an image, render it with an image
tag sized to 150x150 pixels, for example:
<img src=\"<image-url>\" alt=\"<item-name>\" style=\"width:150px;height:150px;\"/>
Keep the layout clean and uncluttered, and use emphasis sparingly.";

/// Assistant configuration composed from adapter configs.
#[derive(Debug, Deserialize)]
pub struct AssistantConfig {
    /// Conversational model configuration.
    pub model: ModelConfig,
    /// Menu catalog configuration.
    pub catalog: CatalogConfig,
}

/// Model-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the model API.
    #[serde(default = "default_model_base_url")]
    pub base_url: String,
    /// API key for the model API.
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "gemini-2.0-flash-001".to_string()
}

fn default_model_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl ModelConfig {
    /// Builds the Gemini adapter configuration, including the markup
    /// system instruction.
    #[must_use]
    pub fn to_gemini(&self) -> GeminiConfig {
        let mut config = GeminiConfig::new(self.model.clone())
            .with_base_url(self.base_url.clone())
            .with_system_instruction(ASSISTANT_SYSTEM_PROMPT);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        config
    }
}

/// Catalog-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API.
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    /// Access token; resolved per request by the hosting layer.
    pub access_token: Option<String>,
}

fn default_catalog_base_url() -> String {
    "https://connect.squareup.com".to_string()
}

impl CatalogConfig {
    /// Builds the Square adapter configuration.
    #[must_use]
    pub fn to_square(&self) -> SquareCatalogConfig {
        SquareCatalogConfig {
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantConfigError {
    /// Configuration could not be loaded or deserialized.
    LoadFailed { reason: String },
}

impl fmt::Display for AssistantConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed { reason } => {
                write!(f, "failed to load assistant configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for AssistantConfigError {}

impl AssistantConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<AssistantConfigError>> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AssistantConfigError::LoadFailed {
                reason: e.to_string(),
            })?;
        Ok(config
            .try_deserialize()
            .map_err(|e| AssistantConfigError::LoadFailed {
                reason: e.to_string(),
            })?)
    }
}
