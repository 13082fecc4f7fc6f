//! Gemini adapter.
//!
//! Implements [`ChatModel`] and [`LlmBackend`] against a Gemini-style
//! `generateContent` API. Sessions accumulate their contents locally and
//! replay the whole exchange on every call, which is how the upstream API
//! models multi-turn conversations.

use crate::backend::{GenerateRequest, GenerateResponse, LlmBackend, TokenUsage};
use crate::error::ModelError;
use crate::session::{
    ChatMessage, ChatModel, ChatRole, ChatSession, ModelTurn, SessionInput, ToolCallRequest,
    ToolDeclaration,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Configuration for the Gemini adapter.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL of the API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key, sent as a request header when present.
    pub api_key: Option<String>,
    /// System instruction applied to every session.
    pub system_instruction: Option<String>,
}

impl GeminiConfig {
    /// Creates a configuration for the hosted API.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: model.into(),
            api_key: None,
            system_instruction: None,
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Overrides the base URL (proxies or test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Gemini-backed model.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiModel {
    /// Creates an adapter with the given configuration.
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn generate_content(
        &self,
        contents: &[Content],
        tools: Option<&[ToolDeclaration]>,
        system: Option<&str>,
        generation: Option<GenerationConfig>,
    ) -> Result<GenerateContentResponse, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let request = GenerateContentRequest {
            contents,
            tools: tools.map(|declarations| {
                vec![ToolsEntry {
                    function_declarations: declarations.to_vec(),
                }]
            }),
            system_instruction: system.map(SystemInstruction::from_text),
            generation_config: generation.filter(GenerationConfig::is_set),
        };

        let mut builder = self.http.post(url).json(&request);
        if let Some(key) = self.config.api_key.as_deref() {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder.send().await.map_err(|e| ModelError::Unavailable {
            reason: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::Unavailable {
                reason: format!("model endpoint returned {status}"),
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ModelError::ResponseParseFailed {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn start_session(
        &self,
        history: Vec<ChatMessage>,
        tools: Vec<ToolDeclaration>,
    ) -> Result<Box<dyn ChatSession>, ModelError> {
        let contents = history.into_iter().map(Content::from_message).collect();
        Ok(Box::new(GeminiSession {
            model: self.clone(),
            contents,
            tools,
        }))
    }
}

#[async_trait]
impl LlmBackend for GeminiModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let contents = [Content::user_text(request.prompt.clone())];
        let system = request
            .system
            .as_deref()
            .or(self.config.system_instruction.as_deref());
        let generation = GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        };
        let response = self
            .generate_content(&contents, None, system, Some(generation))
            .await?;

        let usage = response.usage();
        let content = response
            .first_content()
            .map(|content| content.joined_text())
            .unwrap_or_default();
        debug!(
            model = %self.config.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "one-shot generation finished"
        );
        Ok(GenerateResponse {
            content,
            usage,
            model: self.config.model.clone(),
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// An in-flight Gemini session.
struct GeminiSession {
    model: GeminiModel,
    contents: Vec<Content>,
    tools: Vec<ToolDeclaration>,
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send(&mut self, input: SessionInput) -> Result<ModelTurn, ModelError> {
        self.contents.push(match input {
            SessionInput::Text(text) => Content::user_text(text),
            SessionInput::ToolResult(payload) => Content::function_response(
                payload.name,
                payload.response,
            ),
        });

        let response = self
            .model
            .generate_content(
                &self.contents,
                Some(&self.tools),
                self.model.config.system_instruction.as_deref(),
                None,
            )
            .await?;

        let content = response
            .first_content()
            .ok_or_else(|| ModelError::ResponseParseFailed {
                reason: "response carried no candidates".to_string(),
            })?;

        // Keep the model's reply in the session context.
        self.contents.push(content.clone());
        Ok(content.into_turn())
    }
}

const ROLE_USER: &str = "user";
const ROLE_MODEL: &str = "model";

/// A content entry of the `generateContent` wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn from_message(message: ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::User => ROLE_USER,
            ChatRole::Assistant => ROLE_MODEL,
        };
        Self {
            role: role.to_string(),
            parts: vec![Part::text(message.content)],
        }
    }

    fn user_text(text: String) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            parts: vec![Part::text(text)],
        }
    }

    fn function_response(name: String, response: JsonValue) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            parts: vec![Part {
                text: None,
                function_call: None,
                function_response: Some(FunctionResponse { name, response }),
            }],
        }
    }

    fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    fn into_turn(self) -> ModelTurn {
        let accompanying = {
            let text = self.joined_text();
            if text.trim().is_empty() { None } else { Some(text) }
        };
        match self
            .parts
            .into_iter()
            .find_map(|part| part.function_call)
        {
            Some(call) => ModelTurn::ToolCall {
                call: ToolCallRequest {
                    name: call.name,
                    arguments: call.args,
                },
                text: accompanying,
            },
            None => ModelTurn::Text {
                text: accompanying.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        rename = "functionCall",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    function_call: Option<FunctionCall>,
    #[serde(
        rename = "functionResponse",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: JsonValue,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolsEntry>>,
    #[serde(
        rename = "systemInstruction",
        skip_serializing_if = "Option::is_none"
    )]
    system_instruction: Option<SystemInstruction>,
    #[serde(
        rename = "generationConfig",
        skip_serializing_if = "Option::is_none"
    )]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(
        rename = "maxOutputTokens",
        skip_serializing_if = "Option::is_none"
    )]
    max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    fn is_set(&self) -> bool {
        self.temperature.is_some() || self.max_output_tokens.is_some()
    }
}

#[derive(Debug, Serialize)]
struct ToolsEntry {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

impl SystemInstruction {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![Part::text(text.to_string())],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    fn first_content(&self) -> Option<Content> {
        self.candidates.first().and_then(|c| c.content.clone())
    }

    fn usage(&self) -> TokenUsage {
        self.usage_metadata
            .as_ref()
            .map(|usage| TokenUsage {
                input_tokens: usage.prompt_token_count.unwrap_or(0),
                output_tokens: usage.candidates_token_count.unwrap_or(0),
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_maps_assistant_to_model_role() {
        let content = Content::from_message(ChatMessage::assistant("Here you go."));
        assert_eq!(content.role, ROLE_MODEL);
        assert_eq!(content.joined_text(), "Here you go.");
    }

    #[test]
    fn function_call_response_parses_into_tool_call_turn() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "functionCall": { "name": "getMenuItem", "args": {} } }]
                }
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(raw).expect("parse");
        let turn = response.first_content().expect("content").into_turn();

        match turn {
            ModelTurn::ToolCall { call, text } => {
                assert_eq!(call.name, "getMenuItem");
                assert!(text.is_none());
            }
            ModelTurn::Text { .. } => panic!("expected a tool call turn"),
        }
    }

    #[test]
    fn text_response_parses_into_text_turn() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "## Menu\n" }, { "text": "* Burger" }]
                }
            }],
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 4 }
        });
        let response: GenerateContentResponse = serde_json::from_value(raw).expect("parse");
        assert_eq!(response.usage().total(), 14);

        let turn = response.first_content().expect("content").into_turn();
        assert_eq!(
            turn,
            ModelTurn::Text {
                text: "## Menu\n* Burger".to_string()
            }
        );
    }

    #[test]
    fn tool_call_keeps_accompanying_text() {
        let content: Content = serde_json::from_value(serde_json::json!({
            "role": "model",
            "parts": [
                { "text": "Let me remove that." },
                { "functionCall": { "name": "markItem86", "args": {} } }
            ]
        }))
        .expect("parse");

        match content.into_turn() {
            ModelTurn::ToolCall { text, .. } => {
                assert_eq!(text.as_deref(), Some("Let me remove that."));
            }
            ModelTurn::Text { .. } => panic!("expected a tool call turn"),
        }
    }

    #[test]
    fn request_wire_shape_uses_camel_case() {
        let contents = [Content::user_text("hi".to_string())];
        let request = GenerateContentRequest {
            contents: &contents,
            tools: Some(vec![ToolsEntry {
                function_declarations: vec![ToolDeclaration::new("getMenuItem", "Lists items")],
            }]),
            system_instruction: Some(SystemInstruction::from_text("Markup only.")),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.5),
                max_output_tokens: None,
            }),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert!(json["tools"][0]["functionDeclarations"].is_array());
        assert!(json["systemInstruction"]["parts"].is_array());
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn function_response_content_targets_the_tool() {
        let content = Content::function_response(
            "getMenuItem".to_string(),
            serde_json::json!({ "menuItems": [] }),
        );
        let json = serde_json::to_value(&content).expect("serialize");
        assert_eq!(json["parts"][0]["functionResponse"]["name"], "getMenuItem");
    }
}
