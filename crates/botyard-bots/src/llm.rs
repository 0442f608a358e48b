//! Language model access for the built-in bots.
//!
//! Bots talk to a [`LanguageModel`]; the production implementation is
//! [`OpenAiClient`], which speaks the OpenAI-compatible chat completions
//! API. Tests substitute their own model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use botyard_core::{BotEnv, BuildError, BuildResult};

/// Credential holding the OpenAI API key.
pub const API_KEY_CREDENTIAL: &str = "openai_api_key";

/// Settings section the runtime fills from its `llm` configuration.
pub const SETTINGS_SECTION: &str = "llm";

// =============================================================================
// Errors
// =============================================================================

/// Errors from a language model call.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("API error {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body as returned by the API.
        body: String,
    },

    /// The API answered without any message content.
    #[error("empty response from language model")]
    EmptyResponse,

    /// No model was configured for this bot.
    #[error("no language model configured (set OPENAI_API_KEY)")]
    Unconfigured,
}

/// Shared, type-erased language model.
pub type SharedModel = Arc<dyn LanguageModel>;

/// A single-turn text completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends `prompt` as one user message and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

// =============================================================================
// Settings
// =============================================================================

/// Model settings read from the `llm` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo".to_string(),
            temperature: 0.2,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Builds the model every LLM bot needs; a missing key fails the build.
pub fn model_from_env(env: &BotEnv) -> BuildResult<SharedModel> {
    let api_key = env.credential(API_KEY_CREDENTIAL)?;
    let settings: LlmSettings = env.section(SETTINGS_SECTION)?;
    Ok(Arc::new(OpenAiClient::new(api_key, settings)?))
}

/// Builds a model when the key is present, `None` otherwise.
pub fn optional_model_from_env(env: &BotEnv) -> BuildResult<Option<SharedModel>> {
    match env.optional_credential(API_KEY_CREDENTIAL) {
        None => Ok(None),
        Some(_) => model_from_env(env).map(Some),
    }
}

// =============================================================================
// OpenAI-compatible client
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    api_key: String,
    settings: LlmSettings,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// Creates a client; fails when the HTTP client cannot be configured.
    pub fn new(api_key: impl Into<String>, settings: LlmSettings) -> BuildResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| BuildError::InvalidSettings {
                section: SETTINGS_SECTION.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_key: api_key.into(),
            settings,
            http,
        })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
        };

        debug!(model = %self.settings.model, "Sending chat completion request");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_missing_key_fails_the_build() {
        let err = model_from_env(&BotEnv::new()).err().unwrap();
        assert!(matches!(err, BuildError::MissingCredential { key } if key == API_KEY_CREDENTIAL));
    }

    #[test]
    fn test_optional_model_without_key() {
        assert!(optional_model_from_env(&BotEnv::new()).unwrap().is_none());
    }

    #[test]
    fn test_settings_come_from_section() {
        let env = BotEnv::new().with_section(
            SETTINGS_SECTION,
            json!({ "model": "local-model", "base_url": "http://localhost:11434/v1/" }),
        );
        let settings: LlmSettings = env.section(SETTINGS_SECTION).unwrap();
        let client = OpenAiClient::new("sk-test", settings).unwrap();

        assert_eq!(client.settings().model, "local-model");
        assert_eq!(client.settings().timeout_secs, 60);
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            model: "gpt-4-turbo",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.2,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hi");
        assert_eq!(value["model"], "gpt-4-turbo");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = OpenAiClient::new("sk-secret", LlmSettings::default()).unwrap();
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
