//! Analyze client abstraction and the Anthropic implementation.
//!
//! The coordinator only needs [`AnalyzeClient::analyze`]: content in, raw
//! issues out, or an [`AnalyzeError`]. [`AnthropicClient`] calls the Messages
//! API with a fixed misalignment-analysis prompt and decodes the model's JSON
//! reply.
//!
//! # Error mapping
//!
//! - HTTP 401 → [`AnalyzeError::Api`] "Invalid API key…"
//! - HTTP 429 → [`AnalyzeError::Api`] "Rate limit exceeded…"
//! - other non-2xx → [`AnalyzeError::Api`] with the response body
//! - timeout or connection failure → [`AnalyzeError::Network`]
//! - response envelope without a `content` array → [`AnalyzeError::Parse`]
//!
//! A reply whose text is not a JSON array is not an error: it decodes to an
//! empty issue list. Nothing is retried here; the next edit is the retry.

use anyhow::{bail, Result};
use async_trait::async_trait;
use resonnet_core::models::RawIssue;
use resonnet_core::parse::decode_issues;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;

/// Version header required by the Messages API.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str =
    "You analyze prompts for potential misalignments between human intent and LLM interpretation.";

/// Failure of a single analyze call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzeError {
    /// The service answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    /// Timeout or connection failure.
    #[error("network error: {0}")]
    Network(String),
    /// The response could not be understood.
    #[error("invalid response: {0}")]
    Parse(String),
    #[error("{0}")]
    Other(String),
}

impl AnalyzeError {
    /// HTTP status for [`AnalyzeError::Api`].
    pub fn status(&self) -> Option<u16> {
        match self {
            AnalyzeError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to the person typing.
    pub fn user_message(&self) -> String {
        match self {
            AnalyzeError::Api { message, .. } => message.clone(),
            AnalyzeError::Network(message) => message.clone(),
            AnalyzeError::Parse(_) => "Invalid response format from API".to_string(),
            AnalyzeError::Other(message) => message.clone(),
        }
    }
}

/// The remote analysis service, as seen by the coordinator.
#[async_trait]
pub trait AnalyzeClient: Send + Sync {
    /// Returns the model identifier used for analysis.
    fn model_name(&self) -> &str;

    /// Analyze `content` and return the issues found in it.
    async fn analyze(&self, content: &str) -> Result<Vec<RawIssue>, AnalyzeError>;
}

/// Analyze client backed by the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    base_url: String,
}

impl AnthropicClient {
    /// Create a client, reading the API key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is unset or empty.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", config.api_key_env),
        };
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ClientConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_body(&self, content: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": build_prompt(content) }
            ],
        })
    }
}

#[async_trait]
impl AnalyzeClient for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, content: &str) -> Result<Vec<RawIssue>, AnalyzeError> {
        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&self.request_body(content))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body_text));
        }

        let envelope: Value = resp
            .json()
            .await
            .map_err(|e| AnalyzeError::Parse(e.to_string()))?;
        let text = reply_text(&envelope)?;

        match decode_issues(&text) {
            Ok(issues) => {
                debug!(issues = issues.len(), "analysis reply decoded");
                Ok(issues)
            }
            Err(e) => {
                warn!(error = %e, "model reply is not JSON, treating as no issues");
                Ok(Vec::new())
            }
        }
    }
}

/// Instructions sent with every analysis request.
pub fn build_prompt(content: &str) -> String {
    format!(
        "Analyze this prompt segment for potential misalignments between human intent and LLM interpretation.\n\
         Respond with a JSON array where each object contains:\n\
         \n\
         1. \"text\": The specific text containing the potential misalignment\n\
         2. \"category\": One of [AMBIGUOUS_INSTRUCTION, UNDERSPECIFIED_PARAMETERS, CAPABILITY_ASSUMPTION, CONFLICTING_DIRECTIVES]\n\
         3. \"suggestion\": A single concrete rewrite suggestion\n\
         \n\
         Only include substantive issues that would affect even state-of-the-art models.\n\
         \n\
         Prompt segment to analyze: {}",
        content
    )
}

/// Text of the first content block, or an empty string when the first block
/// is not text.
fn reply_text(envelope: &Value) -> Result<String, AnalyzeError> {
    let blocks = envelope
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| AnalyzeError::Parse("missing content array".to_string()))?;

    let text = blocks
        .first()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .and_then(|block| block.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default();

    Ok(text.to_string())
}

fn api_error(status: u16, body_text: &str) -> AnalyzeError {
    let message = match status {
        401 => "Invalid API key. Please check your API key and try again.".to_string(),
        429 => "Rate limit exceeded. Please try again later.".to_string(),
        _ => {
            let detail = serde_json::from_str::<Value>(body_text)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| body_text.trim().to_string());
            if detail.is_empty() {
                "API request failed".to_string()
            } else {
                format!("API request failed: {}", detail)
            }
        }
    };
    AnalyzeError::Api { status, message }
}

fn classify_transport_error(err: reqwest::Error) -> AnalyzeError {
    if err.is_timeout() {
        AnalyzeError::Network("Request timed out. Please try again.".to_string())
    } else if err.is_connect() || err.is_request() {
        AnalyzeError::Network(
            "Network error. Please check your internet connection.".to_string(),
        )
    } else {
        AnalyzeError::Other(err.to_string())
    }
}

/// Build the configured analyze client.
pub fn create_client(config: &ClientConfig) -> Result<Arc<dyn AnalyzeClient>> {
    Ok(Arc::new(AnthropicClient::new(config)?))
}
