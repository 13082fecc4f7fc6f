//! Tool-aware conversational sessions.
//!
//! A session is started from persisted history plus the tool declarations
//! advertised for the turn. Each `send` yields a [`ModelTurn`]: either the
//! final text, or a request to invoke a declared tool. A tool's result is
//! sent back into the *same* session so the model can weave it into a
//! coherent final answer.

use crate::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The role of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// User/human message.
    User,
    /// Assistant message.
    Assistant,
}

/// A single entry of conversational history handed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user entry.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant entry.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Declaration of a tool the model may request during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Unique tool name.
    pub name: String,
    /// What the tool does, phrased for the model.
    pub description: String,
    /// JSON schema of the tool's parameters.
    pub parameters: JsonValue,
}

impl ToolDeclaration {
    /// Creates a declaration with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({ "type": "object" }),
        }
    }

    /// Sets the parameter schema.
    #[must_use]
    pub fn with_parameters(mut self, parameters: JsonValue) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The declared tool name.
    pub name: String,
    /// Model-supplied arguments.
    pub arguments: JsonValue,
}

/// The result of a tool invocation, fed back into the session.
///
/// Failures travel through here as data too, so the model can phrase an
/// apology instead of the turn aborting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPayload {
    /// The tool that produced the result.
    pub name: String,
    /// The result payload.
    pub response: JsonValue,
}

/// One model response within a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// The model answered with text.
    Text {
        /// The answer text.
        text: String,
    },
    /// The model requested a tool invocation.
    ToolCall {
        /// The requested invocation.
        call: ToolCallRequest,
        /// Text accompanying the request, if any.
        text: Option<String>,
    },
}

impl ModelTurn {
    /// Returns true when this turn requests a tool invocation.
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall { .. })
    }
}

/// Input sent into a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    /// A user message.
    Text(String),
    /// The result of the tool invocation the model requested.
    ToolResult(ToolResultPayload),
}

/// A conversational model that supports tool-aware sessions.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Starts a session seeded with history and tool declarations.
    async fn start_session(
        &self,
        history: Vec<ChatMessage>,
        tools: Vec<ToolDeclaration>,
    ) -> Result<Box<dyn ChatSession>, ModelError>;
}

/// An in-flight session; `send` keeps the accumulated context.
#[async_trait]
pub trait ChatSession: Send {
    /// Sends input and returns the model's next turn.
    async fn send(&mut self, input: SessionInput) -> Result<ModelTurn, ModelError>;
}
