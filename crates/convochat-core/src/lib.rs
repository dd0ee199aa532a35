//! Core abstractions for conversational chat.
//!
//! This crate provides the fundamental building blocks:
//! - `ChatMessage` - Role-tagged message shared by transcript and model context
//! - `ChatHistory` - Append-only model context, with an in-memory backend
//! - `ChatPromptTemplate` - Generic prompt templating with history placeholders
//! - `ChatModel` - Trait for chat completion backends
//! - `EventStore` - Broadcast + history for transcript redraws

pub mod event;
pub mod event_store;
pub mod history;
pub mod message;
pub mod model;
pub mod prompt;

pub use event::ChatEvent;
pub use event_store::EventStore;
pub use history::{ChatHistory, HistoryError, InMemoryChatHistory};
pub use message::{ChatMessage, Role};
pub use model::{ChatModel, ModelError, ModelOutput};
pub use prompt::{ChatPromptTemplate, PromptError, PromptPart, PromptValues};
