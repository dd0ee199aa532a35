//! History store implementations.

use std::sync::Arc;

use async_trait::async_trait;
use convochat_core::{ChatHistory, HistoryError};

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryHistoryStore;

/// Session id used when the caller does not pick one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Maps a session id to its model context history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// History for `session_id`, created empty on first use.
    async fn get_or_create(&self, session_id: &str) -> Result<Arc<dyn ChatHistory>, HistoryError>;

    /// History for `session_id`, if it exists.
    async fn get(&self, session_id: &str) -> Result<Option<Arc<dyn ChatHistory>>, HistoryError>;
}
