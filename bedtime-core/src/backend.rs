//! Generative text backend.
//!
//! Every stage talks to the model through [`TextBackend`], a single
//! `complete(prompt, temperature)` capability. The production implementation
//! wraps the Claude Messages API; tests substitute [`crate::MockBackend`].

use async_trait::async_trait;
use claude::{Claude, Message, Request};
use thiserror::Error;
use tracing::debug;

/// Default maximum tokens for a single completion.
pub const DEFAULT_MAX_TOKENS: usize = 2048;

/// Uniform failure reported by a backend.
///
/// Timeouts, quota errors and malformed responses all collapse into this one
/// kind; the pipeline never branches on the underlying cause.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The backend returned nothing usable.
    pub fn empty_response() -> Self {
        Self::new("backend returned an empty response")
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<claude::Error> for BackendError {
    fn from(err: claude::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A request/response text-completion service.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Generate text for `prompt` sampled at `temperature`.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, BackendError>;
}

/// [`TextBackend`] backed by the Claude Messages API.
#[derive(Clone)]
pub struct ClaudeBackend {
    client: Claude,
    max_tokens: usize,
}

impl ClaudeBackend {
    /// Wrap an existing Claude client.
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a backend from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, BackendError> {
        Ok(Self::new(Claude::from_env()?))
    }

    /// Set the model used for every stage.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.client = self.client.with_model(model);
        self
    }

    /// Set max tokens per completion.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }
}

#[async_trait]
impl TextBackend for ClaudeBackend {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        let request = Request::new(vec![Message::user(prompt)])
            .with_max_tokens(self.max_tokens)
            .with_temperature(temperature);

        let response = self.client.complete(request).await?;
        debug!(
            stop_reason = ?response.stop_reason,
            output_tokens = response.usage.output_tokens,
            "claude completion finished"
        );
        Ok(response.text())
    }
}
