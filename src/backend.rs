//! Generation backend abstraction and implementations.
//!
//! Defines the [`GenerationBackend`] trait every pipeline stage calls through,
//! and the concrete providers:
//! - **[`OpenAIBackend`]**: calls an OpenAI-compatible `/chat/completions` endpoint.
//! - **[`EchoBackend`]**: offline, returns a deterministic placeholder per stage.
//! - **[`DisabledBackend`]**: fails every call; used when generation is switched off.
//!
//! # Provider Selection
//!
//! Use [`create_backend`] to instantiate the appropriate backend based on
//! the configuration:
//!
//! ```rust
//! # use litreport::config::BackendConfig;
//! # use litreport::backend::create_backend;
//! let config = BackendConfig { provider: "echo".to_string(), ..Default::default() };
//! let backend = create_backend(&config).unwrap();
//! assert_eq!(backend.model_name(), "echo");
//! ```
//!
//! # Failure Policy
//!
//! A backend call is a single request: there is no retry and no backoff.
//! Any error (network, HTTP status, malformed body) is returned as a
//! [`BackendError`] and aborts the run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::models::ParagraphRole;

/// The pipeline stage a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Summary of a whole document (or of one chunk of it).
    Summary,
    /// Combination of per-chunk summaries into one book summary.
    SummaryReduce,
    Comparison,
    Thesis,
    Title,
    Paragraph(ParagraphRole),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Summary => f.write_str("summary"),
            Stage::SummaryReduce => f.write_str("summary-reduce"),
            Stage::Comparison => f.write_str("comparison"),
            Stage::Thesis => f.write_str("thesis"),
            Stage::Title => f.write_str("title"),
            Stage::Paragraph(role) => write!(f, "paragraph:{}", role),
        }
    }
}

/// A single role-tagged request to the backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub stage: Stage,
    /// System instruction.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Any failure of a backend call. Fatal to the run.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("generation backend is disabled")]
    Disabled,
    #[error("{0} environment variable not set")]
    MissingApiKey(String),
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Capability interface for text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini-2024-07-18"`).
    fn model_name(&self) -> &str;

    /// Generate text for one request. The result is trimmed.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

// ============ Disabled Backend ============

/// A backend that fails every call.
///
/// Used when `backend.provider = "disabled"`. Commands that never reach a
/// generation stage (extraction, chunk listing, rendering) still work.
pub struct DisabledBackend;

#[async_trait]
impl GenerationBackend for DisabledBackend {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        Err(BackendError::Disabled)
    }
}

// ============ Echo Backend ============

/// Offline backend returning a fixed placeholder per stage.
///
/// Paragraph placeholders are four sentences long and quote a title, so a
/// report assembled from them has the same shape as a real one.
pub struct EchoBackend;

impl EchoBackend {
    pub fn placeholder(stage: Stage) -> String {
        match stage {
            Stage::Summary => "Summary of \"Untitled\": \"a quoted line\" shows the theme.".to_string(),
            Stage::SummaryReduce => {
                "Combined summary of \"Untitled\": \"a quoted line\" shows the theme.".to_string()
            }
            Stage::Comparison => "The three works treat the theme differently.".to_string(),
            Stage::Thesis => "\"One\", \"Two\", and \"Three\" share the theme.".to_string(),
            Stage::Title => "Placeholder Report Title Here".to_string(),
            Stage::Paragraph(role) => format!(
                "This is the {} paragraph. It has a second sentence. It cites \"Untitled\". It ends here.",
                role
            ),
        }
    }
}

#[async_trait]
impl GenerationBackend for EchoBackend {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        Ok(Self::placeholder(request.stage))
    }
}

// ============ OpenAI Backend ============

#[derive(Serialize, Deserialize, Clone, Debug)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Backend using an OpenAI-compatible chat-completions API.
///
/// Calls `POST {base_url}/chat/completions` with a system and a user message.
/// The API key is read from the environment variable named in config
/// (`OPENAI_API_KEY` by default).
pub struct OpenAIBackend {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    api_key: String,
}

impl OpenAIBackend {
    /// Create a new backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key variable is not set or the HTTP
    /// client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| BackendError::MissingApiKey(config.api_key_env.clone()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            stage = %request.stage,
            prompt_chars = request.prompt.len(),
            max_tokens = request.max_tokens,
            "backend request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(json)
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
fn parse_chat_response(json: serde_json::Value) -> Result<String, BackendError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_value(json).map_err(|e| BackendError::Malformed(e.to_string()))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::Malformed("response has no choices".to_string()))?;
    let content = choice.message.content.trim().to_string();
    if content.is_empty() {
        return Err(BackendError::Malformed("empty message content".to_string()));
    }
    Ok(content)
}

/// Create the appropriate [`GenerationBackend`] based on configuration.
///
/// | Config Value | Backend |
/// |-------------|---------|
/// | `"openai"` | [`OpenAIBackend`] |
/// | `"echo"` | [`EchoBackend`] |
/// | `"disabled"` | [`DisabledBackend`] |
pub fn create_backend(config: &BackendConfig) -> anyhow::Result<Arc<dyn GenerationBackend>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIBackend::new(config)?)),
        "echo" => Ok(Arc::new(EchoBackend)),
        "disabled" => Ok(Arc::new(DisabledBackend)),
        other => anyhow::bail!("Unknown backend provider: {}", other),
    }
}
