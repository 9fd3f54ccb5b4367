//! OpenAI-compatible translation backend.
//!
//! Speaks the `/chat/completions` dialect, which also covers local servers
//! (Ollama, vLLM, LM Studio) when pointed at their base URL. Each call
//! translates exactly one chunk; the caller owns chunking and reassembly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use glossa_core::{defaults, Error, Result, TranslationBackend};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Configuration for the OpenAI-compatible translator.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model slug sent with every request.
    pub model: String,
    /// Language the documents arrive in.
    pub source_lang: String,
    /// Language to translate into.
    pub target_lang: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: defaults::TRANSLATE_MODEL.to_string(),
            source_lang: defaults::SOURCE_LANG.to_string(),
            target_lang: defaults::TARGET_LANG.to_string(),
            timeout_seconds: defaults::TRANSLATE_TIMEOUT_SECS,
        }
    }
}

impl TranslatorConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| defaults::OPENAI_BASE_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("TRANSLATE_MODEL")
                .unwrap_or_else(|_| defaults::TRANSLATE_MODEL.to_string()),
            source_lang: std::env::var("TRANSLATE_SOURCE_LANG")
                .unwrap_or_else(|_| defaults::SOURCE_LANG.to_string()),
            target_lang: std::env::var("TRANSLATE_TARGET_LANG")
                .unwrap_or_else(|_| defaults::TARGET_LANG.to_string()),
            timeout_seconds: std::env::var("TRANSLATE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::TRANSLATE_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_languages(
        mut self,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        self.source_lang = source_lang.into();
        self.target_lang = target_lang.into();
        self
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Request body for the chat completions endpoint.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the chat completions endpoint.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Single chat completion choice.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Error response from an OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// Detailed error information.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// =============================================================================
// BACKEND
// =============================================================================

/// Chat-completions-backed implementation of [`TranslationBackend`].
pub struct OpenAITranslator {
    client: Client,
    config: TranslatorConfig,
}

impl OpenAITranslator {
    /// Create a new translator with the given configuration.
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Translation(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "translate",
            base_url = %config.base_url,
            model = %config.model,
            "initializing translator"
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(TranslatorConfig::default())
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(TranslatorConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Instruction pinned to every request. Literal by intent: the output
    /// feeds a rendered document, so summaries or commentary would corrupt it.
    fn system_prompt(&self) -> String {
        format!(
            "You are a professional academic translator. Translate {} into {}. \
             Do not summarize, do not add explanations, keep structure. \
             Translate as literally as possible while keeping grammar natural.",
            self.config.source_lang, self.config.target_lang
        )
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }
}

#[async_trait]
impl TranslationBackend for OpenAITranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        debug!(
            subsystem = "translate",
            model = %self.config.model,
            chars = text.chars().count(),
            "translating chunk"
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: defaults::TRANSLATE_TEMPERATURE,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Translation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ApiErrorResponse = response.json().await.unwrap_or(ApiErrorResponse {
                error: ApiError {
                    message: "Unknown error".to_string(),
                },
            });
            return Err(Error::Translation(format!(
                "translation API returned {}: {}",
                status, body.error.message
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Translation(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| Error::Translation("response contained no choices".to_string()))?;

        debug!(
            subsystem = "translate",
            chars = content.chars().count(),
            "chunk translated"
        );
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert_eq!(config.base_url, defaults::OPENAI_BASE_URL);
        assert_eq!(config.model, defaults::TRANSLATE_MODEL);
        assert_eq!(config.source_lang, defaults::SOURCE_LANG);
        assert_eq!(config.target_lang, defaults::TARGET_LANG);
        assert_eq!(config.timeout_seconds, defaults::TRANSLATE_TIMEOUT_SECS);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = TranslatorConfig::default()
            .with_base_url("http://localhost:11434/v1")
            .with_api_key("test-key")
            .with_model("llama3")
            .with_languages("German", "French");

        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.model, "llama3");
        assert_eq!(config.source_lang, "German");
        assert_eq!(config.target_lang, "French");
    }

    #[test]
    fn test_system_prompt_names_both_languages() {
        let translator = OpenAITranslator::new(
            TranslatorConfig::default().with_languages("English", "Korean"),
        )
        .unwrap();

        let prompt = translator.system_prompt();
        assert!(prompt.contains("Translate English into Korean"));
        assert!(prompt.contains("Do not summarize"));
    }

    #[test]
    fn test_model_name_accessor() {
        let translator =
            OpenAITranslator::new(TranslatorConfig::default().with_model("test-model")).unwrap();
        assert_eq!(translator.model_name(), "test-model");
    }

    #[tokio::test]
    async fn test_translate_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("번역된 문단")))
            .mount(&server)
            .await;

        let translator =
            OpenAITranslator::new(TranslatorConfig::default().with_base_url(server.uri()))
                .unwrap();

        let out = translator.translate("A paragraph.").await.unwrap();
        assert_eq!(out, "번역된 문단");
    }

    #[tokio::test]
    async fn test_translate_sends_model_and_user_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4.1-mini",
                "messages": [
                    {"role": "system"},
                    {"role": "user", "content": "Hello world."}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let translator =
            OpenAITranslator::new(TranslatorConfig::default().with_base_url(server.uri()))
                .unwrap();
        translator.translate("Hello world.").await.unwrap();
    }

    #[tokio::test]
    async fn test_translate_sends_bearer_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let translator = OpenAITranslator::new(
            TranslatorConfig::default()
                .with_base_url(server.uri())
                .with_api_key("secret-key"),
        )
        .unwrap();
        translator.translate("text").await.unwrap();
    }

    #[tokio::test]
    async fn test_translate_surfaces_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {
                    "message": "Rate limit reached",
                    "type": "rate_limit_error",
                    "code": "rate_limit"
                }
            })))
            .mount(&server)
            .await;

        let translator =
            OpenAITranslator::new(TranslatorConfig::default().with_base_url(server.uri()))
                .unwrap();

        let err = translator.translate("text").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("Rate limit reached"));
    }

    #[tokio::test]
    async fn test_translate_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "x", "choices": []})),
            )
            .mount(&server)
            .await;

        let translator =
            OpenAITranslator::new(TranslatorConfig::default().with_base_url(server.uri()))
                .unwrap();

        assert!(translator.translate("text").await.is_err());
    }
}
