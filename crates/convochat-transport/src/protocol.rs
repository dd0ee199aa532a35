//! Wire protocol for client-server communication.

use convochat_core::{ChatEvent, ChatMessage, Role};
use serde::{Deserialize, Serialize};

/// Message from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Text typed into the chat input.
    Submit { text: String },
    /// Ping for keepalive.
    Ping,
}

impl ClientMessage {
    #[must_use]
    pub fn submit(text: impl Into<String>) -> Self {
        Self::Submit { text: text.into() }
    }
}

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Transcript entry to draw.
    Message { role: Role, content: String },
    /// A reply is being generated.
    Thinking,
    /// No reply is being generated.
    Idle,
    /// Error message.
    Error { message: String },
    /// Pong response.
    Pong,
}

impl From<ChatMessage> for ServerMessage {
    fn from(msg: ChatMessage) -> Self {
        Self::Message {
            role: msg.role,
            content: msg.content,
        }
    }
}

impl From<ChatEvent> for ServerMessage {
    fn from(event: ChatEvent) -> Self {
        match event {
            ChatEvent::Message(msg) => msg.into(),
            ChatEvent::Thinking => Self::Thinking,
            ChatEvent::Idle => Self::Idle,
            ChatEvent::Error { message } => Self::Error { message },
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}
