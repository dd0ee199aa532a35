//! Chat model abstraction.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::ChatMessage;

/// Model error.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Model configuration error: {0}")]
    Config(String),
}

/// What a model returned for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Reply text, when the response carried the expected content field.
    pub content: Option<String>,
    /// The response as received.
    pub raw: Value,
}

impl ModelOutput {
    /// Output with reply text.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            raw: Value::String(content.clone()),
            content: Some(content),
        }
    }

    /// Output without a content field.
    #[must_use]
    pub const fn raw(raw: Value) -> Self {
        Self { content: None, raw }
    }

    /// Reply text, falling back to the string form of the raw response.
    #[must_use]
    pub fn into_text(self) -> String {
        match self.content {
            Some(content) => content,
            None => match self.raw {
                Value::String(s) => s,
                other => other.to_string(),
            },
        }
    }
}

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the full message list and return the model's reply.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ModelOutput, ModelError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for std::sync::Arc<T> {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ModelOutput, ModelError> {
        (**self).invoke(messages).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
