//! In-memory conversation store.
//!
//! The reference implementation of [`ConversationStore`]. Durable
//! backends live behind the same trait.

use crate::conversation::{Conversation, ConversationSummary};
use crate::error::StoreError;
use crate::message::Message;
use crate::store::ConversationStore;
use async_trait::async_trait;
use chrono::Utc;
use copper_ticket_core::{ConversationId, UserId};
use std::collections::HashMap;
use tokio::sync::RwLock;

type UserConversations = HashMap<ConversationId, Conversation>;

/// Conversation store backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    inner: RwLock<HashMap<UserId, UserConversations>>,
}

impl InMemoryConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let guard = self.inner.read().await;
        let mut found = guard
            .get(&user)
            .and_then(|conversations| conversations.get(&conversation))
            .cloned();
        if let Some(conversation) = found.as_mut() {
            conversation.sort_messages();
        }
        Ok(found)
    }

    async fn create(
        &self,
        user: UserId,
        first_message: Message,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new(first_message);
        let mut guard = self.inner.write().await;
        guard
            .entry(user)
            .or_default()
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn append(
        &self,
        user: UserId,
        conversation: ConversationId,
        message: Message,
    ) -> Result<Conversation, StoreError> {
        let mut guard = self.inner.write().await;
        let stored = guard
            .get_mut(&user)
            .and_then(|conversations| conversations.get_mut(&conversation))
            .ok_or(StoreError::NotFound { id: conversation })?;

        // Merge by id: a message already present is left as-is.
        if !stored.messages.iter().any(|m| m.id == message.id) {
            stored.messages.push(message);
        }
        stored.sort_messages();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_summaries(
        &self,
        user: UserId,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let guard = self.inner.read().await;
        let mut summaries: Vec<_> = guard
            .get(&user)
            .map(|conversations| conversations.values().map(Conversation::summary).collect())
            .unwrap_or_default();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn delete(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<bool, StoreError> {
        let mut guard = self.inner.write().await;
        Ok(guard
            .get_mut(&user)
            .is_some_and(|conversations| conversations.remove(&conversation).is_some()))
    }
}
