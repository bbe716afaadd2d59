//! Completion-service integrations and the SQL generation client.
//!
//! [`LlmClient`] talks HTTP to one provider and implements
//! [`CompletionService`]. [`ModelClient`] sits on top of any service: it
//! builds the prompt, calls the default model and, if that fails, retries
//! once with a fallback model.
//!
//! # Supported Providers
//!
//! | Provider | Endpoint | Authentication |
//! |----------|----------|----------------|
//! | Gemini | `generativelanguage.googleapis.com` | `x-goog-api-key` header |
//! | OpenAI | `api.openai.com` | Bearer token |
//! | Anthropic | `api.anthropic.com` | `x-api-key` header |
//! | Ollama | Local (configurable) | None |
//!
//! # Fallback
//!
//! When the default model fails for any reason the client picks one
//! alternative: the first pinned fallback model if any are configured,
//! otherwise the first model reported by the service whose identifier
//! contains the model family (e.g. `gemini`). There is no further retry.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use sql_query_generator::llm::{LlmClient, LlmProvider, ModelClient, ModelSettings};
//!
//! let provider = LlmProvider::Ollama;
//! let service = LlmClient::new(provider, None, Duration::from_secs(60));
//! let client = ModelClient::new(
//!     service,
//!     ModelSettings {
//!         model:           "llama3.2".into(),
//!         family:          "llama".into(),
//!         fallback_models: Vec::new()
//!     }
//! );
//! ```

pub mod prompt;
mod wire;

use std::{future::Future, time::Duration};

use tracing::{debug, info, warn};
use wire::{
    AnthropicRequest, AnthropicResponse, ChatMessage, GeminiContent, GeminiModelList, GeminiPart,
    GeminiRequest, GeminiResponse, ModelList, OllamaRequest, OllamaResponse, OllamaTags,
    OpenAIRequest, OpenAIResponse
};

use self::prompt::build_prompt;
use crate::{
    error::{AppResult, generation_error, http_error, llm_api_error},
    executor::ENGINE_DIALECT,
    query::GeneratedQuery,
    schema::SchemaDescription
};

/// Text-in/text-out completion service
pub trait CompletionService {
    /// Generate a completion for `prompt` with `model`
    fn complete(&self, model: &str, prompt: &str) -> impl Future<Output = AppResult<String>> + Send;

    /// Model identifiers currently offered by the service
    fn list_models(&self) -> impl Future<Output = AppResult<Vec<String>>> + Send;
}

/// LLM provider configuration with authentication credentials.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Google Gemini API
    Gemini {
        /// API key
        api_key: String
    },
    /// OpenAI API (GPT-4, GPT-4o, etc.)
    OpenAI {
        /// API key (sk-...)
        api_key: String
    },
    /// Anthropic API (Claude models)
    Anthropic {
        /// API key
        api_key: String
    },
    /// Local Ollama instance
    Ollama
}

impl LlmProvider {
    /// Base URL used when none is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini { .. } => "https://generativelanguage.googleapis.com",
            Self::OpenAI { .. } => "https://api.openai.com",
            Self::Anthropic { .. } => "https://api.anthropic.com",
            Self::Ollama => "http://localhost:11434"
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Gemini { .. } => "Gemini",
            Self::OpenAI { .. } => "OpenAI",
            Self::Anthropic { .. } => "Anthropic",
            Self::Ollama => "Ollama"
        }
    }
}

/// HTTP client for one completion provider
pub struct LlmClient {
    provider: LlmProvider,
    base_url: String,
    client:   reqwest::Client
}

impl LlmClient {
    /// Create a client; `base_url` overrides the provider's default endpoint
    pub fn new(provider: LlmProvider, base_url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let base_url = base_url
            .unwrap_or_else(|| provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            provider,
            base_url,
            client
        }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    async fn send_checked(&self, request: reqwest::RequestBuilder) -> AppResult<reqwest::Response> {
        let response = request.send().await.map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "{} API error {}: {}",
                self.provider.name(),
                status,
                text
            )));
        }
        Ok(response)
    }

    async fn call_gemini(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string()
                }]
            }]
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            bare_model_name(model)
        );
        let response = self
            .send_checked(
                self.client
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .json(&request)
            )
            .await?;
        let result: GeminiResponse = response.json().await.map_err(http_error)?;
        result
            .text()
            .ok_or_else(|| llm_api_error("Empty response from Gemini"))
    }

    async fn call_openai(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = OpenAIRequest {
            model:    model.to_string(),
            messages: vec![ChatMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }]
        };
        let response = self
            .send_checked(
                self.client
                    .post(format!("{}/v1/chat/completions", self.base_url))
                    .header("Authorization", format!("Bearer {}", api_key))
                    .json(&request)
            )
            .await?;
        let result: OpenAIResponse = response.json().await.map_err(http_error)?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| llm_api_error("Empty response from OpenAI"))
    }

    async fn call_anthropic(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = AnthropicRequest {
            model:      model.to_string(),
            max_tokens: 1024,
            messages:   vec![ChatMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }]
        };
        let response = self
            .send_checked(
                self.client
                    .post(format!("{}/v1/messages", self.base_url))
                    .header("x-api-key", api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&request)
            )
            .await?;
        let result: AnthropicResponse = response.json().await.map_err(http_error)?;
        result
            .content
            .into_iter()
            .map(|c| c.text)
            .find(|text| !text.is_empty())
            .ok_or_else(|| llm_api_error("Empty response from Anthropic"))
    }

    async fn call_ollama(&self, model: &str, prompt: &str) -> AppResult<String> {
        let request = OllamaRequest {
            model:  model.to_string(),
            prompt: prompt.to_string(),
            stream: false
        };
        let response = self
            .send_checked(
                self.client
                    .post(format!("{}/api/generate", self.base_url))
                    .json(&request)
            )
            .await?;
        let result: OllamaResponse = response.json().await.map_err(http_error)?;
        if result.response.is_empty() {
            return Err(llm_api_error("Empty response from Ollama"));
        }
        Ok(result.response)
    }

    async fn list_gemini(&self, api_key: &str) -> AppResult<Vec<String>> {
        let url = format!("{}/v1beta/models?pageSize=1000", self.base_url);
        let response = self
            .send_checked(self.client.get(&url).header("x-goog-api-key", api_key))
            .await?;
        let list: GeminiModelList = response.json().await.map_err(http_error)?;
        Ok(list
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods.is_empty()
                    || m.supported_generation_methods
                        .iter()
                        .any(|method| method == "generateContent")
            })
            .map(|m| bare_model_name(&m.name).to_string())
            .collect())
    }

    async fn list_openai(&self, api_key: &str) -> AppResult<Vec<String>> {
        let response = self
            .send_checked(
                self.client
                    .get(format!("{}/v1/models", self.base_url))
                    .header("Authorization", format!("Bearer {}", api_key))
            )
            .await?;
        let list: ModelList = response.json().await.map_err(http_error)?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn list_anthropic(&self, api_key: &str) -> AppResult<Vec<String>> {
        let response = self
            .send_checked(
                self.client
                    .get(format!("{}/v1/models", self.base_url))
                    .header("x-api-key", api_key)
                    .header("anthropic-version", "2023-06-01")
            )
            .await?;
        let list: ModelList = response.json().await.map_err(http_error)?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn list_ollama(&self) -> AppResult<Vec<String>> {
        let response = self
            .send_checked(self.client.get(format!("{}/api/tags", self.base_url)))
            .await?;
        let tags: OllamaTags = response.json().await.map_err(http_error)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

impl CompletionService for LlmClient {
    async fn complete(&self, model: &str, prompt: &str) -> AppResult<String> {
        debug!(provider = self.provider.name(), model, "sending completion request");
        match &self.provider {
            LlmProvider::Gemini {
                api_key
            } => self.call_gemini(api_key, model, prompt).await,
            LlmProvider::OpenAI {
                api_key
            } => self.call_openai(api_key, model, prompt).await,
            LlmProvider::Anthropic {
                api_key
            } => self.call_anthropic(api_key, model, prompt).await,
            LlmProvider::Ollama => self.call_ollama(model, prompt).await
        }
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        match &self.provider {
            LlmProvider::Gemini {
                api_key
            } => self.list_gemini(api_key).await,
            LlmProvider::OpenAI {
                api_key
            } => self.list_openai(api_key).await,
            LlmProvider::Anthropic {
                api_key
            } => self.list_anthropic(api_key).await,
            LlmProvider::Ollama => self.list_ollama().await
        }
    }
}

/// Model selection for [`ModelClient`]
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Default model identifier
    pub model:           String,
    /// Substring a listed model must contain to be used as fallback
    pub family:          String,
    /// Pinned fallback models; when non-empty the service is not listed
    pub fallback_models: Vec<String>
}

/// Generates SQL from natural language with a single-step model fallback
pub struct ModelClient<S> {
    service:  S,
    settings: ModelSettings
}

impl<S: CompletionService> ModelClient<S> {
    pub fn new(service: S, settings: ModelSettings) -> Self {
        Self {
            service,
            settings
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Prompt that [`generate`](Self::generate) would send
    pub fn prompt(&self, schema: &SchemaDescription, request: &str) -> String {
        build_prompt(schema.as_str(), request, ENGINE_DIALECT)
    }

    /// Ask the model for SQL answering `request`.
    ///
    /// # Errors
    ///
    /// Returns a generation error when the default model fails and either
    /// no fallback model exists, the model listing fails, or the fallback
    /// model fails as well.
    pub async fn generate(
        &self,
        schema: &SchemaDescription,
        request: &str
    ) -> AppResult<GeneratedQuery> {
        let prompt = self.prompt(schema, request);
        let model = self.settings.model.as_str();
        info!(model, "requesting SQL from model");
        let primary_error = match self.service.complete(model, &prompt).await {
            Ok(text) => return Ok(GeneratedQuery::from_completion(model, text)),
            Err(e) => e
        };
        let primary_error = primary_error.render_message().into_owned();
        warn!(model, error = %primary_error, "default model failed, looking for a fallback");

        let fallback = match self.fallback_model().await {
            Ok(Some(fallback)) => fallback,
            Ok(None) => {
                return Err(generation_error(format!(
                    "No {} models available. Please check your API key and access. \
                     Original error: {}",
                    self.settings.family, primary_error
                )));
            }
            Err(list_error) => {
                return Err(generation_error(format!(
                    "Could not list available models: {}. Original error: {}",
                    list_error.render_message(),
                    primary_error
                )));
            }
        };

        info!(model = %fallback, "retrying with fallback model");
        let retry = self.service.complete(&fallback, &prompt).await;
        match retry {
            Ok(text) => Ok(GeneratedQuery::from_completion(fallback, text)),
            Err(e) => Err(generation_error(format!(
                "Error generating SQL query with fallback model '{}': {}",
                fallback,
                e.render_message()
            )))
        }
    }

    /// Models from the service that belong to the configured family
    pub async fn family_models(&self) -> AppResult<Vec<String>> {
        let models = self.service.list_models().await?;
        Ok(models
            .into_iter()
            .filter(|m| in_family(m, &self.settings.family))
            .collect())
    }

    async fn fallback_model(&self) -> AppResult<Option<String>> {
        let current = self.settings.model.as_str();
        if !self.settings.fallback_models.is_empty() {
            return Ok(self
                .settings
                .fallback_models
                .iter()
                .find(|m| !same_model(m, current))
                .cloned());
        }
        let models = self.service.list_models().await?;
        debug!(count = models.len(), "listed models");
        Ok(select_fallback(&models, &self.settings.family, current))
    }
}

/// First listed model in `family` that is not `current`
pub fn select_fallback(models: &[String], family: &str, current: &str) -> Option<String> {
    models
        .iter()
        .find(|m| in_family(m, family) && !same_model(m, current))
        .cloned()
}

fn in_family(model: &str, family: &str) -> bool {
    model.to_lowercase().contains(&family.to_lowercase())
}

fn same_model(a: &str, b: &str) -> bool {
    bare_model_name(a).eq_ignore_ascii_case(bare_model_name(b))
}

/// Gemini lists models as `models/<id>`
fn bare_model_name(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// In-memory service: models listed in `working` answer with `answer`
    struct FakeService {
        working: Vec<&'static str>,
        listing: Result<Vec<&'static str>, &'static str>,
        answer:  &'static str,
        calls:   Mutex<Vec<String>>
    }

    impl FakeService {
        fn new(working: Vec<&'static str>, listing: Result<Vec<&'static str>, &'static str>) -> Self {
            Self {
                working,
                listing,
                answer: "```sql\nSELECT * FROM director WHERE birth_year < 1980;\n```",
                calls: Mutex::new(Vec::new())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CompletionService for FakeService {
        async fn complete(&self, model: &str, _prompt: &str) -> AppResult<String> {
            self.calls.lock().unwrap().push(format!("complete:{model}"));
            if self.working.iter().any(|w| *w == model) {
                Ok(self.answer.to_string())
            } else {
                Err(llm_api_error(format!("model {model} not found")))
            }
        }

        async fn list_models(&self) -> AppResult<Vec<String>> {
            self.calls.lock().unwrap().push("list".to_string());
            match &self.listing {
                Ok(models) => Ok(models.iter().map(|m| m.to_string()).collect()),
                Err(e) => Err(llm_api_error(*e))
            }
        }
    }

    fn settings(fallback_models: Vec<String>) -> ModelSettings {
        ModelSettings {
            model: "gemini-1.5-flash".into(),
            family: "gemini".into(),
            fallback_models
        }
    }

    fn schema() -> SchemaDescription {
        SchemaDescription::from_definitions([Some(
            "CREATE TABLE director(id INTEGER, name TEXT, birth_year INTEGER)"
        )])
    }

    #[tokio::test]
    async fn test_default_model_success() {
        let service = FakeService::new(vec!["gemini-1.5-flash"], Ok(vec![]));
        let client = ModelClient::new(service, settings(Vec::new()));
        let query = client
            .generate(&schema(), "Select all directors born before 1980")
            .await
            .unwrap();
        assert_eq!(query.sql, "SELECT * FROM director WHERE birth_year < 1980;");
        assert_eq!(query.model, "gemini-1.5-flash");
        assert!(query.raw.starts_with("```sql"));
        assert_eq!(client.service().calls(), ["complete:gemini-1.5-flash"]);
    }

    #[tokio::test]
    async fn test_fallback_to_listed_family_model() {
        let service = FakeService::new(
            vec!["gemini-2.0-flash"],
            Ok(vec!["text-embedding-004", "gemini-2.0-flash", "gemini-2.5-pro"])
        );
        let client = ModelClient::new(service, settings(Vec::new()));
        let query = client.generate(&schema(), "directors").await.unwrap();
        assert_eq!(query.model, "gemini-2.0-flash");
        assert_eq!(
            client.service().calls(),
            ["complete:gemini-1.5-flash", "list", "complete:gemini-2.0-flash"]
        );
    }

    #[tokio::test]
    async fn test_no_family_model_is_error() {
        let service = FakeService::new(vec![], Ok(vec!["gpt-4o", "claude-3"]));
        let client = ModelClient::new(service, settings(Vec::new()));
        let err = client.generate(&schema(), "directors").await.unwrap_err();
        let message = err.render_message();
        assert!(message.starts_with("Generation error: No gemini models available"));
        assert!(message.contains("model gemini-1.5-flash not found"));
        assert_eq!(client.service().calls(), ["complete:gemini-1.5-flash", "list"]);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_error() {
        let service = FakeService::new(vec![], Ok(vec!["gemini-2.0-flash"]));
        let client = ModelClient::new(service, settings(Vec::new()));
        assert!(client.generate(&schema(), "directors").await.is_err());
        assert_eq!(
            client.service().calls(),
            ["complete:gemini-1.5-flash", "list", "complete:gemini-2.0-flash"]
        );
    }

    #[tokio::test]
    async fn test_listing_failure_is_error() {
        let service = FakeService::new(vec![], Err("invalid api key"));
        let client = ModelClient::new(service, settings(Vec::new()));
        let err = client.generate(&schema(), "directors").await.unwrap_err();
        assert!(err.render_message().contains("Could not list available models: invalid api key"));
    }

    #[tokio::test]
    async fn test_pinned_fallback_skips_listing() {
        let service = FakeService::new(vec!["gemini-pro"], Err("listing must not be called"));
        let client = ModelClient::new(
            service,
            settings(vec!["gemini-1.5-flash".into(), "gemini-pro".into()])
        );
        let query = client.generate(&schema(), "directors").await.unwrap();
        assert_eq!(query.model, "gemini-pro");
        assert_eq!(
            client.service().calls(),
            ["complete:gemini-1.5-flash", "complete:gemini-pro"]
        );
    }

    #[tokio::test]
    async fn test_family_models() {
        let service = FakeService::new(vec![], Ok(vec!["Gemini-Ultra", "gpt-4", "gemini-pro"]));
        let client = ModelClient::new(service, settings(Vec::new()));
        assert_eq!(
            client.family_models().await.unwrap(),
            ["Gemini-Ultra", "gemini-pro"]
        );
    }

    #[test]
    fn test_select_fallback_skips_current() {
        let models = vec![
            "models/gemini-1.5-flash".to_string(),
            "gemini-1.5-pro".to_string()
        ];
        assert_eq!(
            select_fallback(&models, "gemini", "gemini-1.5-flash").as_deref(),
            Some("gemini-1.5-pro")
        );
        assert!(select_fallback(&models, "claude", "gemini-1.5-flash").is_none());
    }

    #[test]
    fn test_bare_model_name() {
        assert_eq!(bare_model_name("models/gemini-pro"), "gemini-pro");
        assert_eq!(bare_model_name("gpt-4"), "gpt-4");
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = LlmClient::new(
            LlmProvider::Ollama,
            Some("http://ollama:11434/".into()),
            Duration::from_secs(5)
        );
        assert_eq!(client.base_url, "http://ollama:11434");
        assert!(matches!(client.provider(), LlmProvider::Ollama));
    }

    #[test]
    fn test_default_base_urls() {
        let gemini = LlmProvider::Gemini {
            api_key: "k".into()
        };
        assert_eq!(
            gemini.default_base_url(),
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(LlmProvider::Ollama.default_base_url(), "http://localhost:11434");
    }
}
