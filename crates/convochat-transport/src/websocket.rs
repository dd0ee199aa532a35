//! WebSocket transport for the browser chat page.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::{get, post},
};
use convochat_core::ChatModel;
use convochat_session::{DEFAULT_SESSION_ID, HistoryStore, SessionManager};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{
    http,
    protocol::{ClientMessage, ServerMessage},
};

/// Handler state shared by the WebSocket and HTTP routes.
pub struct ChatState<M, H>
where
    M: ChatModel,
    H: HistoryStore,
{
    /// Session manager running the turns.
    pub manager: Arc<SessionManager<M, H>>,
    /// Session every connection attaches to.
    pub session_id: Arc<str>,
}

impl<M, H> Clone for ChatState<M, H>
where
    M: ChatModel,
    H: HistoryStore,
{
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            session_id: Arc::clone(&self.session_id),
        }
    }
}

impl<M, H> ChatState<M, H>
where
    M: ChatModel,
    H: HistoryStore,
{
    /// State bound to the default session.
    #[must_use]
    pub fn new(manager: Arc<SessionManager<M, H>>) -> Self {
        Self {
            manager,
            session_id: Arc::from(DEFAULT_SESSION_ID),
        }
    }
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler<M, H>(
    ws: WebSocketUpgrade,
    State(state): State<ChatState<M, H>>,
) -> impl IntoResponse
where
    M: ChatModel + 'static,
    H: HistoryStore + 'static,
{
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket<M, H>(socket: WebSocket, state: ChatState<M, H>)
where
    M: ChatModel + 'static,
    H: HistoryStore + 'static,
{
    let (mut sender, mut receiver) = socket.split();
    let ws_id = Uuid::new_v4();
    tracing::info!("WebSocket {ws_id} connected to session {}", state.session_id);

    // Channel for sending messages to the client
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Spawn task to forward messages to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Replay the transcript, then follow live events
    let mut stream = state.manager.events(&state.session_id).await.history_plus_stream();
    let event_tx = tx.clone();
    let event_task = tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            if event_tx.send(event.into()).is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("WebSocket error: {e}");
                break;
            }
        };

        let client_msg: ClientMessage = match serde_json::from_str(&msg) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid client message: {e}");
                let _ = tx.send(ServerMessage::Error {
                    message: format!("Invalid message: {e}"),
                });
                continue;
            }
        };

        match client_msg {
            ClientMessage::Ping => {
                let _ = tx.send(ServerMessage::Pong);
            }
            ClientMessage::Submit { text } => {
                // Replies and failures reach every client through the event store.
                let manager = Arc::clone(&state.manager);
                let session_id = Arc::clone(&state.session_id);
                tokio::spawn(async move {
                    let _ = manager.submit(&session_id, &text).await;
                });
            }
        }
    }

    event_task.abort();
    send_task.abort();
    tracing::info!("WebSocket {ws_id} disconnected");
}

/// Create the chat router: `/ws`, `/api/transcript`, `/api/events`, `/api/chat`.
///
/// # Example
/// ```ignore
/// let app = Router::new()
///     .route("/", get(index))
///     .merge(create_router(manager));
/// ```
#[must_use]
pub fn create_router<M, H>(manager: Arc<SessionManager<M, H>>) -> axum::Router
where
    M: ChatModel + 'static,
    H: HistoryStore + 'static,
{
    axum::Router::new()
        .route("/ws", get(ws_handler::<M, H>))
        .route("/api/transcript", get(http::transcript_handler::<M, H>))
        .route("/api/events", get(http::events_handler::<M, H>))
        .route("/api/chat", post(http::chat_handler::<M, H>))
        .layer(TraceLayer::new_for_http())
        .with_state(ChatState::new(manager))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use convochat_llm::{Conversation, ScriptedChatModel};
    use convochat_session::{DEFAULT_GREETING, MemoryHistoryStore};
    use serde_json::{Value, json};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{
        MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
    };

    use super::*;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn serve(model: ScriptedChatModel) -> String {
        let manager = SessionManager::new(Conversation::new(model), MemoryHistoryStore::new());
        let app = create_router(Arc::new(manager));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("ws://{addr}/ws")
    }

    async fn next_frame(ws: &mut Client) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let WsMessage::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn send(ws: &mut Client, value: &Value) {
        ws.send(WsMessage::text(value.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn test_replay_then_turn_frames() {
        let url = serve(ScriptedChatModel::with_replies(["Hello!"])).await;
        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

        assert_eq!(
            next_frame(&mut ws).await,
            json!({"type": "message", "role": "assistant", "content": DEFAULT_GREETING})
        );

        send(&mut ws, &json!({"type": "submit", "text": "hi"})).await;
        assert_eq!(
            next_frame(&mut ws).await,
            json!({"type": "message", "role": "user", "content": "hi"})
        );
        assert_eq!(next_frame(&mut ws).await, json!({"type": "thinking"}));
        assert_eq!(
            next_frame(&mut ws).await,
            json!({"type": "message", "role": "assistant", "content": "Hello!"})
        );
        assert_eq!(next_frame(&mut ws).await, json!({"type": "idle"}));

        // A second browser sees the whole transcript
        let (mut late, _) = connect_async(url.as_str()).await.unwrap();
        let contents: Vec<Value> = [
            next_frame(&mut late).await,
            next_frame(&mut late).await,
            next_frame(&mut late).await,
        ]
        .into_iter()
        .map(|frame| frame["content"].clone())
        .collect();
        assert_eq!(contents, vec![json!(DEFAULT_GREETING), json!("hi"), json!("Hello!")]);
    }

    #[tokio::test]
    async fn test_ping_and_invalid_frames() {
        let url = serve(ScriptedChatModel::new()).await;
        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();
        assert_eq!(next_frame(&mut ws).await["type"], "message");

        send(&mut ws, &json!({"type": "ping"})).await;
        assert_eq!(next_frame(&mut ws).await, json!({"type": "pong"}));

        ws.send(WsMessage::text("not json")).await.unwrap();
        let frame = next_frame(&mut ws).await;
        assert_eq!(frame["type"], "error");
        assert!(frame["message"].as_str().unwrap().starts_with("Invalid message"));
    }
}
