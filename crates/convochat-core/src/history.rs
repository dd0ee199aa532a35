//! Model context history.

use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::ChatMessage;

/// History error.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History error: {0}")]
    Internal(String),
}

/// Ordered, append-only store of the messages the model sees each turn.
#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// Snapshot of every stored message, oldest first.
    async fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError>;

    /// Append a batch of messages, preserving their order.
    async fn add_messages(&self, messages: Vec<ChatMessage>) -> Result<(), HistoryError>;

    /// Append a single message.
    async fn add_message(&self, message: ChatMessage) -> Result<(), HistoryError> {
        self.add_messages(vec![message]).await
    }

    /// Drop every stored message.
    async fn clear(&self) -> Result<(), HistoryError>;

    /// Number of stored messages.
    async fn len(&self) -> Result<usize, HistoryError> {
        Ok(self.messages().await?.len())
    }

    async fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len().await? == 0)
    }
}

/// In-memory history.
///
/// Data is lost on restart.
#[derive(Default)]
pub struct InMemoryChatHistory {
    messages: RwLock<Vec<ChatMessage>>,
}

impl InMemoryChatHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatHistory for InMemoryChatHistory {
    async fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        Ok(self
            .messages
            .read()
            .map_err(|e| HistoryError::Internal(e.to_string()))?
            .clone())
    }

    async fn add_messages(&self, messages: Vec<ChatMessage>) -> Result<(), HistoryError> {
        self.messages
            .write()
            .map_err(|e| HistoryError::Internal(e.to_string()))?
            .extend(messages);
        Ok(())
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        self.messages
            .write()
            .map_err(|e| HistoryError::Internal(e.to_string()))?
            .clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, HistoryError> {
        Ok(self
            .messages
            .read()
            .map_err(|e| HistoryError::Internal(e.to_string()))?
            .len())
    }
}
