//! Scripted model for tests.

use crate::backend::{GenerateRequest, GenerateResponse, LlmBackend, TokenUsage};
use crate::error::ModelError;
use crate::session::{
    ChatMessage, ChatModel, ChatSession, ModelTurn, SessionInput, ToolDeclaration,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A model double that replays scripted turns and extractions.
///
/// Session `send` calls pop from the turn script in order; one-shot
/// `generate` calls pop from the extraction script. Every input sent into
/// a session is recorded for assertions. An exhausted script fails with
/// [`ModelError::Unavailable`], which doubles as the unavailable-model
/// fixture.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    turns: Arc<Mutex<VecDeque<ModelTurn>>>,
    generations: Arc<Mutex<VecDeque<String>>>,
    inputs: Arc<Mutex<Vec<SessionInput>>>,
    histories: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedModel {
    /// Creates a model with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next session turn.
    #[must_use]
    pub fn with_turn(self, turn: ModelTurn) -> Self {
        self.turns.lock().expect("turn script").push_back(turn);
        self
    }

    /// Queues the next one-shot generation.
    #[must_use]
    pub fn with_generation(self, content: impl Into<String>) -> Self {
        self.generations
            .lock()
            .expect("generation script")
            .push_back(content.into());
        self
    }

    /// Returns every input sent into any session so far.
    #[must_use]
    pub fn inputs(&self) -> Vec<SessionInput> {
        self.inputs.lock().expect("session inputs").clone()
    }

    /// Returns the history each started session was seeded with.
    #[must_use]
    pub fn histories(&self) -> Vec<Vec<ChatMessage>> {
        self.histories.lock().expect("session histories").clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn start_session(
        &self,
        history: Vec<ChatMessage>,
        _tools: Vec<ToolDeclaration>,
    ) -> Result<Box<dyn ChatSession>, ModelError> {
        self.histories.lock().expect("session histories").push(history);
        Ok(Box::new(ScriptedSession {
            turns: Arc::clone(&self.turns),
            inputs: Arc::clone(&self.inputs),
        }))
    }
}

#[async_trait]
impl LlmBackend for ScriptedModel {
    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let content = self
            .generations
            .lock()
            .expect("generation script")
            .pop_front()
            .ok_or_else(|| ModelError::Unavailable {
                reason: "generation script exhausted".to_string(),
            })?;
        Ok(GenerateResponse {
            content,
            usage: TokenUsage::default(),
            model: "scripted".to_string(),
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSession {
    turns: Arc<Mutex<VecDeque<ModelTurn>>>,
    inputs: Arc<Mutex<Vec<SessionInput>>>,
}

#[async_trait]
impl ChatSession for ScriptedSession {
    async fn send(&mut self, input: SessionInput) -> Result<ModelTurn, ModelError> {
        self.inputs.lock().expect("session inputs").push(input);
        self.turns
            .lock()
            .expect("turn script")
            .pop_front()
            .ok_or_else(|| ModelError::Unavailable {
                reason: "turn script exhausted".to_string(),
            })
    }
}
