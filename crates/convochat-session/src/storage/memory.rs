//! In-memory history store.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use convochat_core::{ChatHistory, HistoryError, InMemoryChatHistory};

use super::HistoryStore;

/// In-memory history store.
///
/// Useful for development and single-process deployments.
/// Data is lost on restart.
pub struct MemoryHistoryStore {
    histories: RwLock<HashMap<String, Arc<InMemoryChatHistory>>>,
}

impl MemoryHistoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get_or_create(&self, session_id: &str) -> Result<Arc<dyn ChatHistory>, HistoryError> {
        let mut histories = self
            .histories
            .write()
            .map_err(|e| HistoryError::Internal(e.to_string()))?;

        let history = histories
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(InMemoryChatHistory::new()));

        Ok(Arc::clone(history) as Arc<dyn ChatHistory>)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Arc<dyn ChatHistory>>, HistoryError> {
        Ok(self
            .histories
            .read()
            .map_err(|e| HistoryError::Internal(e.to_string()))?
            .get(session_id)
            .map(|h| Arc::clone(h) as Arc<dyn ChatHistory>))
    }
}

#[cfg(test)]
mod tests {
    use convochat_core::ChatMessage;

    use super::*;
    use crate::DEFAULT_SESSION_ID;

    #[tokio::test]
    async fn test_same_id_shares_history() {
        let store = MemoryHistoryStore::new();
        assert!(store.get(DEFAULT_SESSION_ID).await.unwrap().is_none());

        let first = store.get_or_create(DEFAULT_SESSION_ID).await.unwrap();
        first.add_message(ChatMessage::user("hi")).await.unwrap();

        let second = store.get_or_create(DEFAULT_SESSION_ID).await.unwrap();
        assert_eq!(second.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_isolated() {
        let store = MemoryHistoryStore::new();
        store
            .get_or_create("a")
            .await
            .unwrap()
            .add_message(ChatMessage::user("hi"))
            .await
            .unwrap();
        let b = store.get_or_create("b").await.unwrap();
        assert!(b.is_empty().await.unwrap());
    }
}
