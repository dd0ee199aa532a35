//! Typed events emitted while a conversation runs.

use serde::{Deserialize, Serialize};

use crate::ChatMessage;

/// Event pushed to every UI attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A transcript entry was appended.
    Message(ChatMessage),
    /// A model call is in flight.
    Thinking,
    /// The model call finished (successfully or not).
    Idle,
    /// The model call failed.
    Error { message: String },
}

impl ChatEvent {
    /// Convert to an SSE event (requires `sse` feature).
    #[cfg(feature = "sse")]
    #[must_use]
    pub fn to_sse_event(&self) -> axum::response::sse::Event {
        let name = match self {
            Self::Message(_) => "message",
            Self::Thinking => "thinking",
            Self::Idle => "idle",
            Self::Error { .. } => "error",
        };
        let data = serde_json::to_string(self).unwrap_or_default();
        axum::response::sse::Event::default().event(name).data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_is_flattened() {
        let event = ChatEvent::Message(ChatMessage::user("hey"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "message", "role": "user", "content": "hey"})
        );
    }
}
