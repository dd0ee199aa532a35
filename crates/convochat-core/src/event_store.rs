//! Broadcast + history event store for transcript redraws.

use std::sync::{PoisonError, RwLock};

use futures::{StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{ChatEvent, ChatMessage};

const CHANNEL_CAPACITY: usize = 1024;

/// Event store with broadcast and transcript support.
///
/// Message events are appended to the display transcript, which is never
/// truncated. A UI that attaches late replays the transcript to redraw it,
/// then switches to live updates. `Thinking`/`Idle`/`Error` are live only.
pub struct EventStore {
    transcript: RwLock<Vec<ChatMessage>>,
    sender: broadcast::Sender<ChatEvent>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    /// Create a new event store.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            transcript: RwLock::new(Vec::with_capacity(32)),
            sender,
        }
    }

    /// Push an event to the transcript (messages only) and live listeners.
    pub fn push(&self, event: ChatEvent) {
        // Append and send under one write lock; see `history_plus_stream`.
        let mut transcript = self
            .transcript
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let ChatEvent::Message(msg) = &event {
            transcript.push(msg.clone());
        }
        let _ = self.sender.send(event);
    }

    /// Append a transcript entry.
    pub fn push_message(&self, msg: ChatMessage) {
        self.push(ChatEvent::Message(msg));
    }

    pub fn push_thinking(&self) {
        self.push(ChatEvent::Thinking);
    }

    pub fn push_idle(&self) {
        self.push(ChatEvent::Idle);
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.push(ChatEvent::Error {
            message: message.into(),
        });
    }

    /// Get a receiver for live updates.
    #[must_use]
    pub fn get_receiver(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// Display transcript: every message event in order.
    #[must_use]
    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stream that yields the transcript first, then live updates.
    ///
    /// Every message shows up exactly once: the snapshot and the
    /// subscription are taken under the read lock, and `push` appends and
    /// broadcasts under the write lock.
    #[must_use]
    pub fn history_plus_stream(&self) -> futures::stream::BoxStream<'static, ChatEvent> {
        let (history, rx) = {
            let transcript = self
                .transcript
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            (transcript.clone(), self.sender.subscribe())
        };

        let hist = futures::stream::iter(history.into_iter().map(ChatEvent::Message));
        let live = BroadcastStream::new(rx).filter_map(|res| future::ready(res.ok()));

        Box::pin(hist.chain(live))
    }

    /// SSE stream (requires `sse` feature).
    #[cfg(feature = "sse")]
    #[must_use]
    pub fn sse_stream(
        &self,
    ) -> futures::stream::BoxStream<'static, Result<axum::response::sse::Event, std::io::Error>>
    {
        self.history_plus_stream()
            .map(|event| Ok::<_, std::io::Error>(event.to_sse_event()))
            .boxed()
    }
}
