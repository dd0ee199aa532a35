//! Chat completion clients and the conversation runner.
//!
//! Provides:
//! - Model configuration (env + explicit, clap flags with feature `cli`)
//! - OpenAI-compatible chat completion client
//! - Scripted model for tests and offline runs
//! - `Conversation` - prompt template + model + history

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod conversation;
pub mod openai;
pub mod scripted;

#[cfg(feature = "cli")]
pub use cli::ModelArgs;
pub use config::{ApiKey, ConfigError, ModelConfig};
pub use conversation::{Conversation, ConversationError};
pub use openai::OpenAiChatModel;
pub use scripted::ScriptedChatModel;
