//! Model session and generation ports for the copper-ticket assistant.
//!
//! This crate provides the two model-facing capabilities:
//!
//! - **ChatModel / ChatSession**: a tool-aware conversational session;
//!   each `send` yields either text or a tool invocation request, and tool
//!   results are fed back into the same session
//! - **LlmBackend**: one-shot inference, used for narrow extraction calls
//!
//! `GeminiModel` implements both against a Gemini-style `generateContent`
//! API; `ScriptedModel` is the test double.

pub mod backend;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod session;

pub use backend::{GenerateRequest, GenerateResponse, LlmBackend, TokenUsage};
pub use error::ModelError;
pub use gemini::{GeminiConfig, GeminiModel};
pub use mock::ScriptedModel;
pub use session::{
    ChatMessage, ChatModel, ChatRole, ChatSession, ModelTurn, SessionInput, ToolCallRequest,
    ToolDeclaration, ToolResultPayload,
};
