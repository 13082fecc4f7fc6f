//! The conversation orchestrator.
//!
//! One invocation drives one user turn through a small state machine:
//! load or create the conversation and persist the user message, run the
//! model session, dispatch at most one tool call, feed the tool's result
//! back into the same session, then append exactly one assistant message
//! and persist. Tool-level failures never abort the turn; authentication
//! and model failures do, and are surfaced distinctly.

use crate::resolver::EntityResolver;
use crate::tool::{ToolContext, ToolRegistry};
use crate::tools::menu_registry;
use copper_ticket_ai::{
    ChatMessage, ChatModel, LlmBackend, ModelError, ModelTurn, SessionInput,
};
use copper_ticket_catalog::CatalogPort;
use copper_ticket_conversation::{Conversation, ConversationStore, Message, MessageRole};
use copper_ticket_core::{ConversationId, UserId};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shown when the model yields neither text nor a usable follow-up.
const FALLBACK_ANSWER: &str = "Could not get a response.";

/// Errors that abort an orchestration invocation.
///
/// Everything else (entity misses, catalog write failures, unknown tools)
/// is converted into a payload the model explains to the user.
#[derive(Debug)]
pub enum OrchestratorError {
    /// No usable catalog credentials for the requesting user.
    AuthenticationMissing,
    /// The conversational model failed; surfaced as-is.
    Model(ModelError),
    /// Conversation storage failed.
    Store(copper_ticket_conversation::StoreError),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationMissing => write!(f, "no usable catalog credentials"),
            Self::Model(error) => write!(f, "model turn failed: {error}"),
            Self::Store(error) => write!(f, "conversation persistence failed: {error}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AuthenticationMissing => None,
            Self::Model(error) => Some(error),
            Self::Store(error) => Some(error),
        }
    }
}

impl From<copper_ticket_conversation::StoreError> for OrchestratorError {
    fn from(error: copper_ticket_conversation::StoreError) -> Self {
        Self::Store(error)
    }
}

/// Drives user turns against the model, the tools, and the store.
pub struct ConversationOrchestrator {
    store: Arc<dyn ConversationStore>,
    model: Arc<dyn ChatModel>,
    catalog: Arc<dyn CatalogPort>,
    resolver: EntityResolver,
    registry: ToolRegistry,
}

impl ConversationOrchestrator {
    /// Creates an orchestrator with the menu tool registry.
    ///
    /// `backend` powers the resolver's extraction calls; it is usually
    /// the same adapter as `model`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        model: Arc<dyn ChatModel>,
        backend: Arc<dyn LlmBackend>,
        catalog: Arc<dyn CatalogPort>,
    ) -> Self {
        let resolver = EntityResolver::new(backend, Arc::clone(&catalog));
        Self {
            store,
            model,
            catalog,
            resolver,
            registry: menu_registry(),
        }
    }

    /// Replaces the tool registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Handles one user turn and returns the updated conversation.
    ///
    /// A missing or unresolvable conversation id creates a fresh
    /// conversation holding the user message. Exactly one assistant
    /// message is appended per call, whether or not a tool ran.
    #[instrument(skip(self, text), fields(user = %user))]
    pub async fn handle_message(
        &self,
        user: UserId,
        conversation_id: Option<ConversationId>,
        text: &str,
    ) -> Result<Conversation, OrchestratorError> {
        let existing = match conversation_id {
            Some(id) => self.store.load(user, id).await?,
            None => None,
        };

        // Persist the user turn before any model round trip, so it
        // survives a model failure and always precedes its reply.
        let (conversation, history) = match existing {
            Some(loaded) => {
                let history = chat_history(&loaded);
                let user_message = Message::user(loaded.next_message_id(), text);
                let conversation = self.store.append(user, loaded.id, user_message).await?;
                (conversation, history)
            }
            None => {
                let conversation = self.store.create(user, Message::user_now(text)).await?;
                (conversation, Vec::new())
            }
        };

        let mut session = self
            .model
            .start_session(history, self.registry.declarations())
            .await
            .map_err(OrchestratorError::Model)?;

        let ctx = ToolContext {
            user_message: text,
            catalog: self.catalog.as_ref(),
            resolver: &self.resolver,
        };

        let mut turn = session
            .send(SessionInput::Text(text.to_string()))
            .await
            .map_err(OrchestratorError::Model)?;
        let mut tool_dispatched = false;

        // Turn states: a text turn is the final answer; the first tool
        // call is dispatched and its result goes back into the same
        // session; a second tool call in the same turn is unsupported
        // and falls back to whatever text accompanied it.
        let answer = loop {
            match turn {
                ModelTurn::Text { text } => break text,
                ModelTurn::ToolCall { call, text } => {
                    if tool_dispatched {
                        warn!(tool = %call.name, "ignoring second tool call in one turn");
                        break text.unwrap_or_default();
                    }
                    tool_dispatched = true;
                    info!(tool = %call.name, "dispatching tool call");
                    let outcome = self
                        .registry
                        .dispatch(&call.name, &call.arguments, &ctx)
                        .await
                        .map_err(|_| OrchestratorError::AuthenticationMissing)?;
                    turn = session
                        .send(SessionInput::ToolResult(outcome.into_payload()))
                        .await
                        .map_err(OrchestratorError::Model)?;
                }
            }
        };
        let answer = if answer.trim().is_empty() {
            FALLBACK_ANSWER.to_string()
        } else {
            answer
        };

        let assistant = Message::assistant(conversation.next_message_id(), answer);
        let updated = self.store.append(user, conversation.id, assistant).await?;
        Ok(updated)
    }
}

/// Converts persisted messages into model history entries.
fn chat_history(conversation: &Conversation) -> Vec<ChatMessage> {
    conversation
        .messages
        .iter()
        .map(|message| match message.role {
            MessageRole::User => ChatMessage::user(message.content.clone()),
            MessageRole::Assistant => ChatMessage::assistant(message.content.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use copper_ticket_ai::{ChatRole, ScriptedModel, ToolCallRequest};
    use copper_ticket_catalog::{CatalogItem, CatalogItemId, InMemoryCatalog};
    use copper_ticket_conversation::InMemoryConversationStore;

    fn text_turn(text: &str) -> ModelTurn {
        ModelTurn::Text {
            text: text.to_string(),
        }
    }

    fn tool_turn(name: &str) -> ModelTurn {
        ModelTurn::ToolCall {
            call: ToolCallRequest {
                name: name.to_string(),
                arguments: serde_json::json!({}),
            },
            text: None,
        }
    }

    struct Fixture {
        store: Arc<InMemoryConversationStore>,
        catalog: Arc<InMemoryCatalog>,
        model: ScriptedModel,
        orchestrator: ConversationOrchestrator,
    }

    fn fixture(model: ScriptedModel) -> Fixture {
        let store = Arc::new(InMemoryConversationStore::new());
        let catalog = Arc::new(InMemoryCatalog::with_items([
            CatalogItem::new("ITEM_1", "Smash Burger").with_image("https://img/burger"),
            CatalogItem::new("ITEM_2", "Caesar Salad").with_availability(false),
        ]));
        let orchestrator = ConversationOrchestrator::new(
            Arc::clone(&store) as Arc<dyn ConversationStore>,
            Arc::new(model.clone()),
            Arc::new(model.clone()),
            Arc::clone(&catalog) as Arc<dyn CatalogPort>,
        );
        Fixture {
            store,
            catalog,
            model,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn direct_answer_creates_conversation_with_user_then_assistant() {
        let fx = fixture(ScriptedModel::new().with_turn(text_turn("Hello! How can I help?")));

        let conversation = fx
            .orchestrator
            .handle_message(UserId::new(), None, "Hi there")
            .await
            .expect("turn");

        assert_eq!(conversation.message_count(), 2);
        assert_eq!(conversation.messages[0].role, MessageRole::User);
        assert_eq!(conversation.messages[0].content, "Hi there");
        assert_eq!(conversation.messages[1].role, MessageRole::Assistant);
        assert_eq!(conversation.messages[1].content, "Hello! How can I help?");
        assert!(conversation.messages[0].id < conversation.messages[1].id);
    }

    #[tokio::test]
    async fn each_invocation_appends_exactly_one_assistant_message() {
        let fx = fixture(
            ScriptedModel::new()
                .with_turn(text_turn("one"))
                .with_turn(text_turn("two"))
                .with_turn(text_turn("three")),
        );
        let user = UserId::new();

        let first = fx
            .orchestrator
            .handle_message(user, None, "a")
            .await
            .expect("turn");
        let second = fx
            .orchestrator
            .handle_message(user, Some(first.id), "b")
            .await
            .expect("turn");
        let third = fx
            .orchestrator
            .handle_message(user, Some(first.id), "c")
            .await
            .expect("turn");

        assert_eq!(second.message_count(), 4);
        assert_eq!(third.message_count(), 6);

        let assistant_count = third
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();
        assert_eq!(assistant_count, 3);

        // Sorting by id reproduces the append order.
        let mut sorted = third.messages.clone();
        sorted.sort_by_key(|m| m.id);
        let order: Vec<_> = sorted.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(order, ["a", "one", "b", "two", "c", "three"]);
    }

    #[tokio::test]
    async fn menu_lookup_feeds_only_available_items_back_to_the_model() {
        let fx = fixture(
            ScriptedModel::new()
                .with_turn(tool_turn("getMenuItem"))
                .with_turn(text_turn("Here is the menu: Smash Burger.")),
        );

        let conversation = fx
            .orchestrator
            .handle_message(UserId::new(), None, "What's on the menu?")
            .await
            .expect("turn");

        // The tool round trip itself produces no visible message.
        assert_eq!(conversation.message_count(), 2);

        let inputs = fx.model.inputs();
        assert_eq!(inputs.len(), 2);
        match &inputs[1] {
            SessionInput::ToolResult(payload) => {
                assert_eq!(payload.name, "getMenuItem");
                let menu = payload.response["menuItems"].as_array().expect("menu");
                assert_eq!(menu.len(), 1);
                assert_eq!(menu[0]["name"], "Smash Burger");
            }
            SessionInput::Text(_) => panic!("expected a tool result payload"),
        }
    }

    #[tokio::test]
    async fn removing_an_item_hides_it_from_the_next_lookup() {
        let fx = fixture(
            ScriptedModel::new()
                .with_turn(tool_turn("markItem86"))
                .with_turn(text_turn("Done, the burger is 86'd."))
                .with_generation("burger,")
                .with_turn(tool_turn("getMenuItem"))
                .with_turn(text_turn("The menu is empty."))
        );
        let user = UserId::new();

        let conversation = fx
            .orchestrator
            .handle_message(user, None, "86 the burger")
            .await
            .expect("turn");
        let item = fx
            .catalog
            .get_availability(&CatalogItemId::new("ITEM_1"))
            .await
            .expect("read");
        assert!(!item.available);

        fx.orchestrator
            .handle_message(user, Some(conversation.id), "What's on the menu?")
            .await
            .expect("turn");

        let inputs = fx.model.inputs();
        match inputs.last().expect("inputs") {
            SessionInput::ToolResult(payload) => {
                let menu = payload.response["menuItems"].as_array().expect("menu");
                assert!(menu.is_empty());
            }
            SessionInput::Text(_) => panic!("expected a tool result payload"),
        }
    }

    #[tokio::test]
    async fn unresolvable_item_produces_the_miss_payload_and_an_answer() {
        let fx = fixture(
            ScriptedModel::new()
                .with_turn(tool_turn("markItem86"))
                .with_turn(text_turn("Sorry, I couldn't find that item."))
                .with_generation("unobtainium special"),
        );

        let conversation = fx
            .orchestrator
            .handle_message(UserId::new(), None, "86 the unobtainium special")
            .await
            .expect("turn");

        assert_eq!(
            conversation.last_message().expect("assistant").content,
            "Sorry, I couldn't find that item."
        );

        let inputs = fx.model.inputs();
        match &inputs[1] {
            SessionInput::ToolResult(payload) => {
                assert_eq!(payload.response["result"], "Could not find menu item");
            }
            SessionInput::Text(_) => panic!("expected a tool result payload"),
        }

        // Catalog state is unchanged.
        let item = fx
            .catalog
            .get_availability(&CatalogItemId::new("ITEM_1"))
            .await
            .expect("read");
        assert!(item.available);
    }

    #[tokio::test]
    async fn unresolvable_conversation_id_creates_a_fresh_conversation() {
        let fx = fixture(ScriptedModel::new().with_turn(text_turn("Welcome!")));
        let user = UserId::new();
        let phantom = ConversationId::new();

        let conversation = fx
            .orchestrator
            .handle_message(user, Some(phantom), "hello")
            .await
            .expect("turn");

        assert_ne!(conversation.id, phantom);
        assert_eq!(conversation.messages[0].role, MessageRole::User);

        let stored = fx
            .store
            .load(user, conversation.id)
            .await
            .expect("load")
            .expect("persisted");
        assert_eq!(stored.message_count(), 2);
    }

    #[tokio::test]
    async fn second_tool_call_in_one_turn_falls_back_to_accompanying_text() {
        let fx = fixture(
            ScriptedModel::new()
                .with_turn(tool_turn("getMenuItem"))
                .with_turn(ModelTurn::ToolCall {
                    call: ToolCallRequest {
                        name: "markItem86".to_string(),
                        arguments: serde_json::json!({}),
                    },
                    text: Some("I listed the menu.".to_string()),
                }),
        );

        let conversation = fx
            .orchestrator
            .handle_message(UserId::new(), None, "menu?")
            .await
            .expect("turn");

        assert_eq!(
            conversation.last_message().expect("assistant").content,
            "I listed the menu."
        );
        // Only the first call was dispatched: one text input, one tool result.
        assert_eq!(fx.model.inputs().len(), 2);
    }

    #[tokio::test]
    async fn second_tool_call_without_text_falls_back_to_fixed_answer() {
        let fx = fixture(
            ScriptedModel::new()
                .with_turn(tool_turn("getMenuItem"))
                .with_turn(tool_turn("getMenuItem")),
        );

        let conversation = fx
            .orchestrator
            .handle_message(UserId::new(), None, "menu?")
            .await
            .expect("turn");
        assert_eq!(
            conversation.last_message().expect("assistant").content,
            FALLBACK_ANSWER
        );
    }

    #[tokio::test]
    async fn model_failure_aborts_but_keeps_the_user_message() {
        let fx = fixture(ScriptedModel::new());
        let user = UserId::new();

        let err = fx
            .orchestrator
            .handle_message(user, None, "hello?")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Model(_)));

        let summaries = fx.store.list_summaries(user).await.expect("list");
        assert_eq!(summaries.len(), 1);
        let stored = fx
            .store
            .load(user, summaries[0].id)
            .await
            .expect("load")
            .expect("conversation");
        assert_eq!(stored.message_count(), 1);
        assert_eq!(stored.messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn missing_catalog_credentials_surface_as_authentication_error() {
        let store = Arc::new(InMemoryConversationStore::new());
        let model = ScriptedModel::new()
            .with_turn(tool_turn("markItem86"))
            .with_generation("burger");
        let orchestrator = ConversationOrchestrator::new(
            store,
            Arc::new(model.clone()),
            Arc::new(model),
            Arc::new(InMemoryCatalog::without_credentials()),
        );

        let err = orchestrator
            .handle_message(UserId::new(), None, "86 the burger")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::AuthenticationMissing));
    }

    #[tokio::test]
    async fn history_passed_to_the_model_excludes_the_current_turn() {
        let fx = fixture(
            ScriptedModel::new()
                .with_turn(text_turn("first answer"))
                .with_turn(text_turn("second answer")),
        );
        let user = UserId::new();

        let conversation = fx
            .orchestrator
            .handle_message(user, None, "first question")
            .await
            .expect("turn");
        fx.orchestrator
            .handle_message(user, Some(conversation.id), "second question")
            .await
            .expect("turn");

        let histories = fx.model.histories();
        assert_eq!(histories.len(), 2);
        assert!(histories[0].is_empty());

        let second = &histories[1];
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].role, ChatRole::User);
        assert_eq!(second[0].content, "first question");
        assert_eq!(second[1].role, ChatRole::Assistant);
        assert_eq!(second[1].content, "first answer");
    }
}
