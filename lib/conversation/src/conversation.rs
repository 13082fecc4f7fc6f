//! The conversation (chat thread) aggregate.
//!
//! A conversation is an append-only, ordered list of messages owned by a
//! single user. Message identifiers are epoch-millisecond timestamps, so
//! sorting by identifier reconstructs conversational order after
//! persistence.

use crate::message::Message;
use chrono::{DateTime, Utc};
use copper_ticket_core::{ConversationId, MessageId};
use serde::{Deserialize, Serialize};

/// A conversation between a user and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// Messages in conversational order.
    pub messages: Vec<Message>,
    /// When the conversation was created.
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// When the conversation was last updated.
    #[serde(rename = "updatedAt", with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a conversation holding its first message.
    #[must_use]
    pub fn new(first_message: Message) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: vec![first_message],
            created_at: now,
            updated_at: now,
        }
    }

    /// Restores conversational order by sorting messages by identifier.
    pub fn sort_messages(&mut self) {
        self.messages.sort_by_key(|m| m.id);
    }

    /// Allocates the identifier for the next appended message.
    ///
    /// The identifier is the current time in epoch milliseconds, bumped
    /// past the latest existing identifier so that appends within the
    /// same millisecond stay strictly increasing.
    #[must_use]
    pub fn next_message_id(&self) -> MessageId {
        let now = MessageId::from_millis(Utc::now().timestamp_millis());
        match self.messages.iter().map(|m| m.id).max() {
            Some(latest) if latest >= now => latest.successor(),
            _ => now,
        }
    }

    /// Appends a message and refreshes the update timestamp.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the listing summary for this conversation.
    #[must_use]
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            created_at: self.created_at,
        }
    }
}

/// A listing entry for a conversation, newest first in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation identifier.
    pub id: ConversationId,
    /// When the conversation was created.
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRole;

    #[test]
    fn conversation_starts_with_first_message() {
        let conversation = Conversation::new(Message::user_now("Hello"));
        assert_eq!(conversation.message_count(), 1);
        assert!(conversation.messages[0].is_user());
    }

    #[test]
    fn next_message_id_is_strictly_increasing() {
        let mut conversation = Conversation::new(Message::user_now("first"));
        for _ in 0..5 {
            let id = conversation.next_message_id();
            assert!(id > conversation.messages.last().unwrap().id);
            conversation.push(Message::assistant(id, "reply"));
        }
    }

    #[test]
    fn next_message_id_bumps_past_future_stamps() {
        let ahead = MessageId::from_millis(i64::MAX - 1);
        let conversation = Conversation::new(Message::user(ahead, "from the future"));
        assert_eq!(conversation.next_message_id(), ahead.successor());
    }

    #[test]
    fn sorting_by_id_restores_order() {
        let mut conversation = Conversation::new(Message::user(MessageId::from_millis(3), "c"));
        conversation.messages.insert(0, Message::user(MessageId::from_millis(2), "b"));
        conversation.messages.insert(0, Message::user(MessageId::from_millis(1), "a"));
        conversation.messages.swap(0, 2);

        conversation.sort_messages();

        let contents: Vec<_> = conversation.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c"]);
    }

    #[test]
    fn push_refreshes_updated_at() {
        let mut conversation = Conversation::new(Message::user_now("Hello"));
        let before = conversation.updated_at;
        let id = conversation.next_message_id();
        conversation.push(Message::new(id, MessageRole::Assistant, "Hi"));
        assert!(conversation.updated_at >= before);
    }

    #[test]
    fn serde_uses_epoch_millis_timestamps() {
        let conversation = Conversation::new(Message::user_now("Hello"));
        let json = serde_json::to_value(&conversation).expect("serialize");
        assert!(json["createdAt"].is_i64());
        assert!(json["updatedAt"].is_i64());

        let parsed: Conversation = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed.id, conversation.id);
        assert_eq!(parsed.message_count(), 1);
    }
}
