//! Language Model Gateway: one prompt in, one completion (or failure) out.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// System message sent with every completion request.
pub const SYSTEM_MESSAGE: &str =
    "You are a precise database operation parser. Always respond with valid JSON only.";

/// Failure to obtain a completion. Every variant means "unavailable".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network failure or timeout.
    #[error("completion transport error: {0}")]
    Transport(String),
    /// Upstream answered with an error status.
    #[error("completion service returned status {0}")]
    Status(u16),
    /// Upstream answered but the body had no usable completion.
    #[error("malformed completion response: {0}")]
    Malformed(String),
    /// No completion service is configured.
    #[error("no completion service configured")]
    NotConfigured,
}

/// Sends a prompt to a text-completion service.
///
/// Implementations do not retry. A slow upstream and a dead one look the same
/// to callers.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Complete `prompt`, returning the trimmed completion text.
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Settings for [`OpenAiCompatibleGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_message: String,
}

impl GatewayConfig {
    /// Default settings with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 500,
            temperature: 0.1,
            system_message: SYSTEM_MESSAGE.to_string(),
        }
    }
}

/// Gateway for any OpenAI-style `/chat/completions` endpoint.
pub struct OpenAiCompatibleGateway {
    config: GatewayConfig,
    agent: ureq::Agent,
}

impl OpenAiCompatibleGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self { config, agent }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

// ── API call ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn call_completions(
    agent: &ureq::Agent,
    config: &GatewayConfig,
    prompt: &str,
) -> Result<String, GatewayError> {
    let request = CompletionRequest {
        model: config.model.clone(),
        messages: vec![
            ApiMessage {
                role: "system",
                content: config.system_message.clone(),
            },
            ApiMessage {
                role: "user",
                content: prompt.to_string(),
            },
        ],
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };

    let response = agent
        .post(&config.api_url)
        .header("Authorization", &format!("Bearer {}", config.api_key))
        .header("content-type", "application/json")
        .send_json(&request)
        .map_err(|e| match e {
            ureq::Error::StatusCode(status) => GatewayError::Status(status),
            other => GatewayError::Transport(other.to_string()),
        })?;

    let body: CompletionResponse = response
        .into_body()
        .read_json()
        .map_err(|e| GatewayError::Malformed(e.to_string()))?;

    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| GatewayError::Malformed("response contained no completion".to_string()))
}

#[async_trait]
impl CompletionGateway for OpenAiCompatibleGateway {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let agent = self.agent.clone();
        let config = self.config.clone();
        let prompt = prompt.to_string();
        let timeout = self.config.timeout;

        // ureq is synchronous, so wrap in spawn_blocking
        let call = tokio::task::spawn_blocking(move || call_completions(&agent, &config, &prompt));

        let result = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(GatewayError::Transport(format!("task join error: {}", join))),
            Err(_) => Err(GatewayError::Transport(format!(
                "timed out after {}s",
                timeout.as_secs()
            ))),
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, model = %self.config.model, "completion request failed");
        }
        result
    }
}

/// Gateway used when no completion service is configured.
///
/// Every call fails, so instructions go straight to the keyword heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

#[async_trait]
impl CompletionGateway for OfflineGateway {
    async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}
