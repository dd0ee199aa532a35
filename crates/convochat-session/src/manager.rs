//! Session manager for running chat turns.

use std::{collections::HashMap, sync::Arc};

use convochat_core::{ChatMessage, ChatModel, EventStore, HistoryError};
use convochat_llm::{Conversation, ConversationError};
use tokio::sync::{Mutex, RwLock};

use crate::storage::HistoryStore;

/// First transcript entry of every session.
pub const DEFAULT_GREETING: &str = "How can I help you today?";

/// Session manager error.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),
    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

/// Display-side state of one session.
#[derive(Clone)]
struct ActiveSession {
    events: Arc<EventStore>,
    turn_lock: Arc<Mutex<()>>,
}

/// Owns the display transcripts and runs turns through the conversation.
///
/// Each session has two append-only containers: the display transcript (an
/// [`EventStore`], seeded with a greeting) and the model context history
/// (from the [`HistoryStore`]). Both live only as long as the process.
pub struct SessionManager<M, H>
where
    M: ChatModel,
    H: HistoryStore,
{
    conversation: Conversation<M>,
    histories: H,
    sessions: RwLock<HashMap<String, ActiveSession>>,
    greeting: String,
}

impl<M, H> SessionManager<M, H>
where
    M: ChatModel,
    H: HistoryStore,
{
    /// Create a new session manager.
    #[must_use]
    pub fn new(conversation: Conversation<M>, histories: H) -> Self {
        Self {
            conversation,
            histories,
            sessions: RwLock::new(HashMap::new()),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }

    /// Replace the greeting shown at the top of new sessions.
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    #[must_use]
    pub const fn conversation(&self) -> &Conversation<M> {
        &self.conversation
    }

    async fn session(&self, session_id: &str) -> ActiveSession {
        if let Some(active) = self.sessions.read().await.get(session_id) {
            return active.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "creating session");
                let events = Arc::new(EventStore::new());
                events.push_message(ChatMessage::assistant(self.greeting.clone()));
                ActiveSession {
                    events,
                    turn_lock: Arc::new(Mutex::new(())),
                }
            })
            .clone()
    }

    /// Event store for a session, for UIs that follow it live.
    pub async fn events(&self, session_id: &str) -> Arc<EventStore> {
        self.session(session_id).await.events
    }

    /// Display transcript of a session, greeting first.
    pub async fn transcript(&self, session_id: &str) -> Vec<ChatMessage> {
        self.session(session_id).await.events.transcript()
    }

    /// Model context history of a session.
    ///
    /// # Errors
    /// Returns error if the history backend fails.
    pub async fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ManagerError> {
        match self.histories.get(session_id).await? {
            Some(history) => Ok(history.messages().await?),
            None => Ok(Vec::new()),
        }
    }

    /// Run one turn.
    ///
    /// Whitespace-only input is ignored and yields `Ok(None)`. Otherwise the
    /// user entry is appended, the model is called, and the reply is
    /// appended and returned. Turns within a session never interleave.
    ///
    /// # Errors
    /// Returns error if the model call fails. The user entry stays in the
    /// transcript; the model history is unchanged.
    pub async fn submit(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<Option<String>, ManagerError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let active = self.session(session_id).await;
        let _turn = active.turn_lock.lock().await;
        let events = &active.events;

        events.push_message(ChatMessage::user(text));
        events.push_thinking();

        let result = async {
            let history = self.histories.get_or_create(session_id).await?;
            let reply = self.conversation.invoke(history.as_ref(), text).await?;
            Ok::<_, ManagerError>(reply)
        }
        .await;

        match result {
            Ok(reply) => {
                events.push_message(ChatMessage::assistant(reply.clone()));
                events.push_idle();
                tracing::debug!(session_id, "turn complete");
                Ok(Some(reply))
            }
            Err(e) => {
                tracing::warn!(session_id, "turn failed: {e}");
                events.push_error(e.to_string());
                events.push_idle();
                Err(e)
            }
        }
    }
}
