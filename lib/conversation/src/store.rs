//! The conversation storage port.

use crate::conversation::{Conversation, ConversationSummary};
use crate::error::StoreError;
use crate::message::Message;
use async_trait::async_trait;
use copper_ticket_core::{ConversationId, UserId};

/// Durable storage of conversations, keyed by user and conversation id.
///
/// `load` returns `None` for an identifier that does not resolve; callers
/// treat that the same as no identifier at all and create a fresh
/// conversation. `append` is a merge-style upsert: it never drops a
/// message already present and refreshes the update timestamp.
///
/// Concurrent `append` calls against one conversation are not serialized
/// by the store alone; the accepted behavior is last-write-wins on the
/// stored document.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Loads a conversation, or `None` when the id does not resolve.
    async fn load(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Creates a conversation holding its first message.
    async fn create(&self, user: UserId, first_message: Message)
    -> Result<Conversation, StoreError>;

    /// Appends a message, merging with whatever is already stored, and
    /// returns the updated conversation.
    async fn append(
        &self,
        user: UserId,
        conversation: ConversationId,
        message: Message,
    ) -> Result<Conversation, StoreError>;

    /// Lists conversation summaries for a user, newest first.
    async fn list_summaries(&self, user: UserId)
    -> Result<Vec<ConversationSummary>, StoreError>;

    /// Deletes a conversation, returning whether it existed.
    async fn delete(&self, user: UserId, conversation: ConversationId)
    -> Result<bool, StoreError>;
}
