//! Plain HTTP endpoints for scripts and non-WebSocket clients.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use convochat_core::{ChatMessage, ChatModel};
use convochat_llm::ConversationError;
use convochat_session::{HistoryStore, ManagerError};
use futures::Stream;

use crate::{
    protocol::{ChatRequest, ChatResponse},
    websocket::ChatState,
};

/// HTTP API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Message text is empty")]
    EmptyInput,
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::EmptyInput => StatusCode::BAD_REQUEST,
            Self::Manager(ManagerError::Conversation(ConversationError::Model(_))) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Manager(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// `GET /api/transcript`: display transcript, greeting first.
pub async fn transcript_handler<M, H>(State(state): State<ChatState<M, H>>) -> Json<Vec<ChatMessage>>
where
    M: ChatModel + 'static,
    H: HistoryStore + 'static,
{
    Json(state.manager.transcript(&state.session_id).await)
}

/// `GET /api/events`: transcript replay, then live events, as SSE.
pub async fn events_handler<M, H>(
    State(state): State<ChatState<M, H>>,
) -> Sse<impl Stream<Item = Result<Event, std::io::Error>>>
where
    M: ChatModel + 'static,
    H: HistoryStore + 'static,
{
    let events = state.manager.events(&state.session_id).await;
    Sse::new(events.sse_stream()).keep_alive(KeepAlive::default())
}

/// `POST /api/chat`: run one turn and return the reply.
///
/// # Errors
/// `400` for blank text, `502` when the model call fails.
pub async fn chat_handler<M, H>(
    State(state): State<ChatState<M, H>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError>
where
    M: ChatModel + 'static,
    H: HistoryStore + 'static,
{
    let reply = state
        .manager
        .submit(&state.session_id, &request.text)
        .await?
        .ok_or(ApiError::EmptyInput)?;
    Ok(Json(ChatResponse { reply }))
}
