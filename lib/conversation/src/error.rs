//! Error types for conversation storage.

use copper_ticket_core::ConversationId;
use std::fmt;

/// Errors from conversation store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Conversation not found (including conversations deleted while an
    /// operation on them was in flight).
    NotFound { id: ConversationId },
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "conversation not found: {id}"),
            Self::StorageFailed { reason } => {
                write!(f, "conversation storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let id = ConversationId::new();
        let err = StoreError::NotFound { id };
        assert!(err.to_string().contains("conversation not found"));
    }
}
