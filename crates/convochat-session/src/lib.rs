//! Session orchestration and storage for conversational chat.
//!
//! Provides:
//! - `SessionManager` - Run turns and own the display transcript
//! - History store implementations (memory)

pub mod manager;
pub mod storage;

pub use manager::{DEFAULT_GREETING, ManagerError, SessionManager};
pub use storage::{DEFAULT_SESSION_ID, HistoryStore};

#[cfg(feature = "memory")]
pub use storage::MemoryHistoryStore;
