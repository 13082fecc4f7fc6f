//! Conversation orchestration for the copper-ticket assistant.
//!
//! This crate composes the ports into the menu-management assistant:
//!
//! - **ToolRegistry**: the tools advertised to the model and their
//!   handlers (menu lookup, 86, un-86)
//! - **EntityResolver**: free text → catalog item
//! - **ConversationOrchestrator**: the per-turn state machine
//! - **AssistantConfig** and tracing setup for the hosting process

pub mod config;
pub mod orchestrator;
pub mod resolver;
pub mod telemetry;
pub mod tool;
pub mod tools;

pub use config::{AssistantConfig, AssistantConfigError, CatalogConfig, ModelConfig};
pub use orchestrator::{ConversationOrchestrator, OrchestratorError};
pub use resolver::{EntityResolver, ResolveFailure};
pub use telemetry::init_tracing;
pub use tool::{ToolAbort, ToolContext, ToolHandler, ToolOutcome, ToolRegistry};
