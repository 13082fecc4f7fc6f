//! Message types for conversations.

use chrono::Utc;
use copper_ticket_core::MessageId;
use serde::{Deserialize, Serialize};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Assistant message.
    Assistant,
}

/// A message in a conversation.
///
/// The identifier is the creation time in epoch milliseconds and doubles
/// as the sort key; content may embed model-produced markup, including
/// inline image references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier, strictly increasing in append order.
    pub id: MessageId,
    /// Message content.
    pub content: String,
    /// Message role.
    pub role: MessageRole,
    /// Presentation-layer flag for freshly produced messages. The core
    /// never interprets it; the store round-trips it untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fresh: Option<bool>,
}

impl Message {
    /// Creates a new message with the given identifier.
    #[must_use]
    pub fn new(id: MessageId, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            role,
            fresh: None,
        }
    }

    /// Creates a user message with the given identifier.
    #[must_use]
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self::new(id, MessageRole::User, content)
    }

    /// Creates an assistant message with the given identifier.
    #[must_use]
    pub fn assistant(id: MessageId, content: impl Into<String>) -> Self {
        Self::new(id, MessageRole::Assistant, content)
    }

    /// Creates a user message stamped with the current time.
    #[must_use]
    pub fn user_now(content: impl Into<String>) -> Self {
        Self::user(MessageId::from_millis(Utc::now().timestamp_millis()), content)
    }

    /// Sets the presentation freshness flag.
    #[must_use]
    pub fn with_fresh(mut self, fresh: bool) -> Self {
        self.fresh = Some(fresh);
        self
    }

    /// Returns true for user messages.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}
