use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::prompt::Message;

const DEFAULT_ENDPOINT: &str = "http://localhost:8081/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Seam between the pipeline and the completion provider, so the
/// pipeline can run against a stub in tests.
#[tonic::async_trait]
pub trait ModelGateway: Send + Sync {
    /// Submit a prompt and return the raw completion text.
    ///
    /// `Ok(None)` means the provider answered but produced no usable
    /// completion (zero choices or an empty message body). Exactly one
    /// outbound call is made; nothing is retried.
    async fn send_prompt(&self, messages: &[Message]) -> Result<Option<String>, ModelError>;
}

/// Provider connection settings, read once at startup and injected.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Read provider settings from the environment. The mock server's
    /// default address stands in when LLM_ENDPOINT is unset, so a
    /// local stack runs with no configuration at all.
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("LLM_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            api_key: std::env::var("LLM_API_KEY").ok(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Chat-completion HTTP client.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, ModelError> {
        if config.endpoint.trim().is_empty() {
            return Err(ModelError::GetClientFailure(
                "model endpoint is empty".to_string(),
            ));
        }

        let http = Client::builder()
            .http1_only()
            .no_proxy()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ModelError::GetClientFailure(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { http, config })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[tonic::async_trait]
impl ModelGateway for LlmClient {
    async fn send_prompt(&self, messages: &[Message]) -> Result<Option<String>, ModelError> {
        let mut request = self
            .http
            .post(&self.config.endpoint)
            .header("Connection", "close")
            .json(&ChatCompletionRequest {
                model: &self.config.model,
                messages,
            });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            ModelError::ResponseFailure(format!(
                "HTTP request to {} failed: {e}",
                self.config.endpoint
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::ResponseFailure(format!(
                "provider returned HTTP {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            ModelError::ResponseFailure(format!("failed to read provider response: {e}"))
        })?;

        // No choices, or a choice with no text, is not an error at
        // this layer. The pipeline decides what an absent completion
        // means.
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|text| !text.is_empty());

        Ok(content)
    }
}
