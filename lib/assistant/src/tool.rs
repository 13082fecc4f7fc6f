//! Tool registry and dispatch.
//!
//! Tools are declared to the model every turn; when the model requests
//! one, the registry resolves the handler from a name-keyed table and
//! validates the supplied arguments against the declared schema before
//! invocation. Failures are modeled as payloads fed back to the model,
//! never as errors that abort the turn. The single exception is missing
//! credentials, which is fatal to the invocation.

use crate::resolver::EntityResolver;
use async_trait::async_trait;
use copper_ticket_ai::{ToolDeclaration, ToolResultPayload};
use copper_ticket_catalog::CatalogPort;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Context handed to a tool handler for one invocation.
pub struct ToolContext<'a> {
    /// The latest raw user message. State-change tools extract their
    /// target from here, not from the model's structured arguments.
    pub user_message: &'a str,
    /// The menu catalog.
    pub catalog: &'a dyn CatalogPort,
    /// Free text → catalog item resolution.
    pub resolver: &'a EntityResolver,
}

/// The payload a tool invocation produced, success or failure alike.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// The tool that produced the payload.
    pub name: String,
    /// The payload handed back to the model.
    pub response: JsonValue,
}

impl ToolOutcome {
    /// Creates an outcome with an arbitrary payload.
    #[must_use]
    pub fn new(name: impl Into<String>, response: JsonValue) -> Self {
        Self {
            name: name.into(),
            response,
        }
    }

    /// Creates an outcome whose payload is a single result string.
    #[must_use]
    pub fn result_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, serde_json::json!({ "result": text.into() }))
    }

    /// Converts the outcome into the session payload.
    #[must_use]
    pub fn into_payload(self) -> ToolResultPayload {
        ToolResultPayload {
            name: self.name,
            response: self.response,
        }
    }
}

/// Conditions that abort the whole invocation instead of producing a
/// failure payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAbort {
    /// The catalog has no usable credentials.
    CredentialsMissing,
}

impl fmt::Display for ToolAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsMissing => write!(f, "catalog credentials missing"),
        }
    }
}

impl std::error::Error for ToolAbort {}

/// A tool the model may invoke.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Returns the declaration advertised to the model.
    fn declaration(&self) -> ToolDeclaration;

    /// Executes the tool. Failures are reported as payloads in the
    /// returned outcome; only credential problems abort.
    async fn execute(
        &self,
        arguments: &JsonValue,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutcome, ToolAbort>;
}

/// Registry of the tools available during conversation.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its declared name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.declaration().name, handler);
    }

    /// Returns the declarations advertised to the model.
    #[must_use]
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.handlers
            .values()
            .map(|handler| handler.declaration())
            .collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatches a tool call requested by the model.
    ///
    /// An unknown tool name or arguments that do not match the declared
    /// schema produce a failure payload, so the model can explain the
    /// miss to the user.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: &JsonValue,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutcome, ToolAbort> {
        let Some(handler) = self.handlers.get(name) else {
            warn!(tool = name, "model requested an unknown tool");
            return Ok(ToolOutcome::result_text(name, "Tool is not available"));
        };

        let declaration = handler.declaration();
        if let Err(reason) = validate_arguments(&declaration, arguments) {
            warn!(tool = name, reason, "rejected tool arguments");
            return Ok(ToolOutcome::result_text(name, "Invalid tool arguments"));
        }

        handler.execute(arguments, ctx).await
    }
}

/// Checks the model-supplied arguments against the declared schema shape.
fn validate_arguments(
    declaration: &ToolDeclaration,
    arguments: &JsonValue,
) -> Result<(), &'static str> {
    if declaration.parameters.get("type").and_then(JsonValue::as_str) == Some("object")
        && !(arguments.is_object() || arguments.is_null())
    {
        return Err("expected an object argument");
    }
    Ok(())
}
