//! Terminal chat client with ratatui.
//!
//! Run with: TOGETHER_API_KEY=... cargo run -p convochat-tui
//!
//! Logs go to stderr only when `RUST_LOG` is set, e.g.
//! `RUST_LOG=debug cargo run -p convochat-tui 2>chat.log`.

use std::{io, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use convochat_llm::{Conversation, ModelArgs};
use convochat_session::{DEFAULT_SESSION_ID, MemoryHistoryStore, SessionManager};
use convochat_transport::tui::{ChatInput, ChatView, InputAction, TuiBridge, render};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

const TITLE: &str = "🗣️ Conversational Chatbot";
const SUBTITLE: &str = "Simple Chat Interface for LLMs by Build Fast with AI";

#[derive(Parser)]
#[command(name = "convochat-tui", version, about = "Conversational chatbot in the terminal")]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_ansi(false)
            .init();
    }

    let cli = Cli::parse();

    let model = cli.model.build_model().context("failed to set up the chat model")?;
    let conversation = Conversation::with_system_prompt(model, cli.model.system_prompt());
    let manager = Arc::new(SessionManager::new(conversation, MemoryHistoryStore::new()));

    let (bridge, session) = TuiBridge::new();
    tokio::spawn(session.run(manager, DEFAULT_SESSION_ID.to_string()));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, bridge);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut bridge: TuiBridge,
) -> anyhow::Result<()> {
    let mut view = ChatView::new();
    let mut input = ChatInput::new();

    loop {
        while let Some(msg) = bridge.try_recv() {
            view.apply(msg);
        }

        terminal.draw(|f| render(f, &view, &input, TITLE, SUBTITLE))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match input.handle_key(&key) {
            InputAction::Quit => return Ok(()),
            InputAction::Submit(text) => bridge
                .submit(text)
                .context("chat session stopped unexpectedly")?,
            InputAction::ScrollUp(lines) => view.scroll_up(lines),
            InputAction::ScrollDown(lines) => view.scroll_down(lines),
            InputAction::None => {}
        }
    }
}
