//! Request and response bodies of the supported completion APIs.

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(super) struct GeminiRequest {
    pub contents: Vec<GeminiContent>
}

#[derive(Serialize, Deserialize)]
pub(super) struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>
}

#[derive(Serialize, Deserialize)]
pub(super) struct GeminiPart {
    #[serde(default)]
    pub text: String
}

#[derive(Deserialize)]
pub(super) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>
}

#[derive(Deserialize)]
pub(super) struct GeminiCandidate {
    pub content: Option<GeminiContent>
}

impl GeminiResponse {
    /// Text parts of the first candidate, concatenated
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Deserialize)]
pub(super) struct GeminiModelList {
    #[serde(default)]
    pub models: Vec<GeminiModel>
}

#[derive(Deserialize)]
pub(super) struct GeminiModel {
    pub name:                         String,
    #[serde(default, rename = "supportedGenerationMethods")]
    pub supported_generation_methods: Vec<String>
}

#[derive(Serialize)]
pub(super) struct OpenAIRequest {
    pub model:    String,
    pub messages: Vec<ChatMessage>
}

#[derive(Serialize)]
pub(super) struct ChatMessage {
    pub role:    String,
    pub content: String
}

#[derive(Deserialize)]
pub(super) struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>
}

#[derive(Deserialize)]
pub(super) struct OpenAIChoice {
    pub message: OpenAIResponseMessage
}

#[derive(Deserialize)]
pub(super) struct OpenAIResponseMessage {
    pub content: Option<String>
}

#[derive(Serialize)]
pub(super) struct AnthropicRequest {
    pub model:      String,
    pub max_tokens: u32,
    pub messages:   Vec<ChatMessage>
}

#[derive(Deserialize)]
pub(super) struct AnthropicResponse {
    pub content: Vec<AnthropicContent>
}

#[derive(Deserialize)]
pub(super) struct AnthropicContent {
    #[serde(default)]
    pub text: String
}

/// Model listing shared by OpenAI and Anthropic
#[derive(Deserialize)]
pub(super) struct ModelList {
    pub data: Vec<ModelEntry>
}

#[derive(Deserialize)]
pub(super) struct ModelEntry {
    pub id: String
}

#[derive(Serialize)]
pub(super) struct OllamaRequest {
    pub model:  String,
    pub prompt: String,
    pub stream: bool
}

#[derive(Deserialize)]
pub(super) struct OllamaResponse {
    pub response: String
}

#[derive(Deserialize)]
pub(super) struct OllamaTags {
    #[serde(default)]
    pub models: Vec<OllamaModel>
}

#[derive(Deserialize)]
pub(super) struct OllamaModel {
    pub name: String
}
