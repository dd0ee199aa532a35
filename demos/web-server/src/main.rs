//! Browser chat page backed by an OpenAI-compatible endpoint.
//!
//! Run with: TOGETHER_API_KEY=... cargo run -p convochat-web
//!
//! Then open http://localhost:3000 in your browser.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, response::Html, routing::get};
use clap::Parser;
use convochat_llm::{Conversation, ModelArgs};
use convochat_session::{MemoryHistoryStore, SessionManager};
use convochat_transport::create_router;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "convochat-web", version, about = "Conversational chatbot in the browser")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "CONVOCHAT_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let model = cli.model.build_model().context("failed to set up the chat model")?;
    let conversation = Conversation::with_system_prompt(model, cli.model.system_prompt());
    let manager = Arc::new(SessionManager::new(conversation, MemoryHistoryStore::new()));

    // Build router
    let app = Router::new()
        .route("/", get(index_handler))
        .merge(create_router(manager))
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(cli.addr)
        .await
        .with_context(|| format!("failed to bind {}", cli.addr))?;
    tracing::info!("Server listening on http://{}", cli.addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <title>Conversational Chatbot</title>
    <style>
        body {
            margin: 0 auto;
            max-width: 760px;
            padding: 20px;
            background: #0e1117;
            color: #fafafa;
            font-family: system-ui, sans-serif;
        }
        h1 { margin-bottom: 4px; }
        h3 { color: #aaa; font-weight: normal; margin-top: 0; }
        #transcript { padding-bottom: 90px; }
        .msg {
            display: flex;
            gap: 12px;
            padding: 12px;
            border-radius: 8px;
            margin: 8px 0;
            white-space: pre-wrap;
        }
        .msg.user { background: #262730; }
        .avatar { font-size: 20px; }
        .status { color: #888; font-size: 14px; min-height: 18px; }
        .error { color: #ff6b6b; }
        form {
            position: fixed;
            bottom: 0;
            left: 0;
            right: 0;
            padding: 16px;
            background: #0e1117;
            display: flex;
            justify-content: center;
        }
        input {
            width: 100%;
            max-width: 720px;
            padding: 12px;
            border-radius: 8px;
            border: 1px solid #444;
            background: #262730;
            color: #fafafa;
            font-size: 16px;
        }
    </style>
</head>
<body>
    <h1>🗣️ Conversational Chatbot</h1>
    <h3>Simple Chat Interface for LLMs by Build Fast with AI</h3>
    <div id="transcript"></div>
    <div class="status" id="status">Connecting...</div>
    <form id="chat">
        <input id="input" autocomplete="off" placeholder="Your question" />
    </form>

    <script>
        const transcript = document.getElementById('transcript');
        const status = document.getElementById('status');
        const form = document.getElementById('chat');
        const input = document.getElementById('input');
        let ws;

        function append(role, content) {
            const row = document.createElement('div');
            row.className = `msg ${role}`;
            const avatar = document.createElement('span');
            avatar.className = 'avatar';
            avatar.textContent = role === 'user' ? '🧑' : '🤖';
            const body = document.createElement('div');
            body.textContent = content;
            row.append(avatar, body);
            transcript.appendChild(row);
            window.scrollTo(0, document.body.scrollHeight);
        }

        function connect() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            ws = new WebSocket(`${protocol}//${window.location.host}/ws`);

            ws.onopen = () => {
                // The server replays the whole transcript on connect.
                transcript.innerHTML = '';
                status.textContent = '';
                status.className = 'status';
            };

            ws.onclose = () => {
                status.textContent = 'Disconnected - reconnecting...';
                status.className = 'status error';
                setTimeout(connect, 2000);
            };

            ws.onerror = (err) => {
                console.error('WebSocket error:', err);
            };

            ws.onmessage = (event) => {
                try {
                    const msg = JSON.parse(event.data);
                    if (msg.type === 'message') {
                        append(msg.role, msg.content);
                    } else if (msg.type === 'thinking') {
                        status.textContent = 'Thinking...';
                        status.className = 'status';
                    } else if (msg.type === 'idle') {
                        if (status.className === 'status') status.textContent = '';
                    } else if (msg.type === 'error') {
                        status.textContent = `Error: ${msg.message}`;
                        status.className = 'status error';
                    }
                } catch (e) {
                    console.error('Failed to parse message:', e);
                }
            };
        }

        form.addEventListener('submit', (e) => {
            e.preventDefault();
            const text = input.value;
            if (!text.trim() || !ws || ws.readyState !== WebSocket.OPEN) return;
            ws.send(JSON.stringify({ type: 'submit', text }));
            input.value = '';
        });

        connect();
    </script>
</body>
</html>
"#;
