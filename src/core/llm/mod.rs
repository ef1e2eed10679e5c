pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for a JSON object response.
    pub json_mode: bool,
}

/// Backend failure. `Display` is the human-readable message stored on runs
/// and outputs.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("model request timed out after {0}s")]
    Timeout(u64),
    #[error("malformed model response: {0}")]
    Malformed(String),
    #[error("model backend not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}

/// Bounds every call of the wrapped provider by `limit`.
pub struct TimeoutProvider {
    inner: Arc<dyn LlmProvider>,
    limit: Duration,
}

impl TimeoutProvider {
    pub fn wrap(inner: Arc<dyn LlmProvider>, limit: Duration) -> Arc<dyn LlmProvider> {
        Arc::new(Self { inner, limit })
    }
}

#[async_trait]
impl LlmProvider for TimeoutProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        match tokio::time::timeout(self.limit, self.inner.complete(messages, options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} call exceeded {}s, abandoning",
                    self.inner.name(),
                    self.limit.as_secs()
                );
                Err(LlmError::Timeout(self.limit.as_secs().max(1)))
            }
        }
    }
}

/// Stand-in used when no API key is configured, so the server still starts
/// and every model call fails with a clear message.
pub struct UnconfiguredProvider;

#[async_trait]
impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured(
            "set llm.api_key in config.toml or OPENAI_API_KEY".to_string(),
        ))
    }
}

/// Pull a JSON payload out of model text: a fenced ```json block first, then
/// a bare object or array.
pub(crate) fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let content_start = start + 7;
        if let Some(end) = trimmed[content_start..].find("```") {
            let block = trimmed[content_start..content_start + end].trim();
            if !block.is_empty() {
                return Some(block);
            }
        }
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    None
}
