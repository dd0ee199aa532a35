//! TUI transport bridge for ratatui applications.

use std::sync::Arc;

use convochat_core::{ChatModel, Role};
use convochat_session::{HistoryStore, SessionManager};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};

/// TUI bridge for connecting terminal UI to a session.
pub struct TuiBridge {
    /// Sender for client messages.
    pub client_tx: mpsc::UnboundedSender<ClientMessage>,
    /// Receiver for server messages.
    pub server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl TuiBridge {
    /// Create a new TUI bridge.
    ///
    /// Returns the bridge and a channel pair for the session side.
    #[must_use]
    pub fn new() -> (Self, TuiSession) {
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        let bridge = Self {
            client_tx,
            server_rx,
        };

        let session = TuiSession {
            client_rx,
            server_tx,
        };

        (bridge, session)
    }

    /// Send typed text to the session.
    ///
    /// # Errors
    /// Returns error if channel is closed.
    pub fn submit(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.client_tx
            .send(ClientMessage::submit(text))
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Receive a server message (non-blocking).
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.server_rx.try_recv().ok()
    }
}

/// Session side of the TUI bridge.
pub struct TuiSession {
    /// Receiver for client messages.
    pub client_rx: mpsc::UnboundedReceiver<ClientMessage>,
    /// Sender for server messages.
    pub server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl TuiSession {
    /// Pump messages between the bridge and a session until the bridge
    /// is dropped.
    ///
    /// The transcript is replayed first, then live events follow.
    pub async fn run<M, H>(mut self, manager: Arc<SessionManager<M, H>>, session_id: String)
    where
        M: ChatModel + 'static,
        H: HistoryStore + 'static,
    {
        let events = manager.events(&session_id).await;
        let mut stream = events.history_plus_stream();
        let session_id: Arc<str> = Arc::from(session_id);

        loop {
            tokio::select! {
                Some(event) = stream.next() => {
                    if self.server_tx.send(event.into()).is_err() {
                        break;
                    }
                }
                msg = self.client_rx.recv() => match msg {
                    Some(ClientMessage::Submit { text }) => {
                        let manager = Arc::clone(&manager);
                        let session_id = Arc::clone(&session_id);
                        tokio::spawn(async move {
                            let _ = manager.submit(&session_id, &text).await;
                        });
                    }
                    Some(ClientMessage::Ping) => {
                        let _ = self.server_tx.send(ServerMessage::Pong);
                    }
                    None => break,
                },
            }
        }
    }
}

/// Send error.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Channel closed")]
    ChannelClosed,
}

/// What a key press asks the app to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Nothing beyond a possible edit of the input line.
    None,
    /// Send this text.
    Submit(String),
    /// Leave the app.
    Quit,
    /// Scroll the transcript towards older entries.
    ScrollUp(u16),
    /// Scroll the transcript towards newer entries.
    ScrollDown(u16),
}

/// Single-line chat input editor.
#[derive(Debug, Default)]
pub struct ChatInput {
    buffer: String,
    /// Cursor position in chars.
    cursor: usize,
}

impl ChatInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in chars.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map_or(self.buffer.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Apply a key press.
    pub fn handle_key(&mut self, key: &KeyEvent) -> InputAction {
        if key.kind == KeyEventKind::Release {
            return InputAction::None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                InputAction::Quit
            }
            KeyCode::Char(c)
                if key.modifiers == KeyModifiers::NONE || key.modifiers == KeyModifiers::SHIFT =>
            {
                let at = self.byte_index();
                self.buffer.insert(at, c);
                self.cursor += 1;
                InputAction::None
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index();
                    self.buffer.remove(at);
                }
                InputAction::None
            }
            KeyCode::Delete => {
                if self.cursor < self.char_len() {
                    let at = self.byte_index();
                    self.buffer.remove(at);
                }
                InputAction::None
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputAction::None
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_len());
                InputAction::None
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::None
            }
            KeyCode::End => {
                self.cursor = self.char_len();
                InputAction::None
            }
            KeyCode::Enter => {
                if self.buffer.trim().is_empty() {
                    return InputAction::None;
                }
                self.cursor = 0;
                InputAction::Submit(std::mem::take(&mut self.buffer))
            }
            KeyCode::Up => InputAction::ScrollUp(1),
            KeyCode::Down => InputAction::ScrollDown(1),
            KeyCode::PageUp => InputAction::ScrollUp(10),
            KeyCode::PageDown => InputAction::ScrollDown(10),
            _ => InputAction::None,
        }
    }
}

/// Client-side copy of the transcript plus status.
#[derive(Debug, Default)]
pub struct ChatView {
    entries: Vec<(Role, String)>,
    thinking: bool,
    last_error: Option<String>,
    /// Lines scrolled back from the bottom.
    scroll_back: u16,
}

impl ChatView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a server message into the view.
    pub fn apply(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Message { role, content } => {
                if role == Role::User {
                    self.last_error = None;
                }
                self.entries.push((role, content));
                self.scroll_back = 0;
            }
            ServerMessage::Thinking => self.thinking = true,
            ServerMessage::Idle => self.thinking = false,
            ServerMessage::Error { message } => self.last_error = Some(message),
            ServerMessage::Pong => {}
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[(Role, String)] {
        &self.entries
    }

    #[must_use]
    pub const fn is_thinking(&self) -> bool {
        self.thinking
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub const fn scroll_up(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub const fn scroll_down(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    fn lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();
        for (role, content) in &self.entries {
            let (label, color) = match role {
                Role::User => ("you", Color::Cyan),
                Role::Assistant => ("assistant", Color::Green),
                Role::System => ("system", Color::DarkGray),
            };
            let label_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
            lines.push(Line::from(Span::styled(label, label_style)));
            for text in content.lines() {
                lines.push(Line::from(text));
            }
            lines.push(Line::from(""));
        }
        lines
    }
}

/// Draw title, transcript, input box, and status bar.
#[allow(clippy::cast_possible_truncation)]
pub fn render(f: &mut Frame, view: &ChatView, input: &ChatInput, title: &str, subtitle: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Min(3),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status
        ])
        .split(f.area());

    let header = Paragraph::new(vec![
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(subtitle, Style::default().fg(Color::DarkGray))),
    ]);
    f.render_widget(header, chunks[0]);

    // Transcript area, pinned to the bottom unless scrolled back
    let visible = chunks[1].height.saturating_sub(2);
    let inner_width = chunks[1].width.saturating_sub(2);
    let transcript = Paragraph::new(view.lines()).wrap(Wrap { trim: false });
    // Rows after wrapping, not logical lines
    let total = transcript.line_count(inner_width).min(u16::MAX as usize) as u16;
    let top = total
        .saturating_sub(visible)
        .saturating_sub(view.scroll_back);
    let transcript = transcript
        .block(Block::default().borders(Borders::ALL).title("Chat"))
        .scroll((top, 0));
    f.render_widget(transcript, chunks[1]);

    let input_box = Paragraph::new(input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Your question"));
    f.render_widget(input_box, chunks[2]);

    let cursor = input.cursor().min(u16::MAX as usize) as u16;
    f.set_cursor_position((chunks[2].x + cursor + 1, chunks[2].y + 1));

    let status = match (view.is_thinking(), view.last_error()) {
        (true, _) => Span::styled("Thinking...", Style::default().fg(Color::Yellow)),
        (false, Some(err)) => Span::styled(format!("Error: {err}"), Style::default().fg(Color::Red)),
        (false, None) => Span::styled("Ready", Style::default().fg(Color::Green)),
    };
    let status_bar = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        status,
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" send | "),
        Span::styled("Ctrl+C", Style::default().fg(Color::Yellow)),
        Span::raw(" quit | "),
        Span::styled("Up/Down/PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" scroll "),
    ]));
    f.render_widget(status_bar, chunks[3]);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use convochat_llm::{Conversation, ScriptedChatModel};
    use convochat_session::{DEFAULT_GREETING, DEFAULT_SESSION_ID, MemoryHistoryStore};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(input: &mut ChatInput, text: &str) {
        for c in text.chars() {
            assert_eq!(input.handle_key(&key(KeyCode::Char(c))), InputAction::None);
        }
    }

    #[test]
    fn test_input_editing() {
        let mut input = ChatInput::new();
        type_text(&mut input, "helo");
        input.handle_key(&key(KeyCode::Left));
        type_text(&mut input, "l");
        assert_eq!(input.as_str(), "hello");

        input.handle_key(&key(KeyCode::Home));
        input.handle_key(&key(KeyCode::Delete));
        assert_eq!(input.as_str(), "ello");

        input.handle_key(&key(KeyCode::End));
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.as_str(), "ell");
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn test_multibyte_editing() {
        let mut input = ChatInput::new();
        type_text(&mut input, "héé");
        input.handle_key(&key(KeyCode::Left));
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.as_str(), "hé");
    }

    #[test]
    fn test_enter_submits_non_blank() {
        let mut input = ChatInput::new();
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), InputAction::None);

        type_text(&mut input, "   ");
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), InputAction::None);

        let mut input = ChatInput::new();
        type_text(&mut input, "hi there");
        assert_eq!(
            input.handle_key(&key(KeyCode::Enter)),
            InputAction::Submit("hi there".to_string())
        );
        assert_eq!(input.as_str(), "");
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn test_control_keys() {
        let mut input = ChatInput::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(input.handle_key(&ctrl_c), InputAction::Quit);
        assert_eq!(input.handle_key(&key(KeyCode::PageUp)), InputAction::ScrollUp(10));
        assert_eq!(input.handle_key(&key(KeyCode::Down)), InputAction::ScrollDown(1));
        assert_eq!(input.as_str(), "");
    }

    #[test]
    fn test_view_tracks_status() {
        let mut view = ChatView::new();
        view.apply(ServerMessage::Message {
            role: Role::User,
            content: "hi".into(),
        });
        view.apply(ServerMessage::Thinking);
        assert!(view.is_thinking());

        view.apply(ServerMessage::Error {
            message: "down".into(),
        });
        view.apply(ServerMessage::Idle);
        assert!(!view.is_thinking());
        assert_eq!(view.last_error(), Some("down"));

        view.apply(ServerMessage::Message {
            role: Role::User,
            content: "again".into(),
        });
        assert_eq!(view.last_error(), None);
        assert_eq!(view.entries().len(), 2);
    }

    #[test]
    fn test_render_shows_transcript_and_status() {
        let mut view = ChatView::new();
        view.apply(ServerMessage::Message {
            role: Role::Assistant,
            content: DEFAULT_GREETING.into(),
        });
        view.apply(ServerMessage::Thinking);
        let input = ChatInput::new();

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| render(f, &view, &input, "Conversational Chatbot", "subtitle"))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(ratatui::buffer::Cell::symbol).collect();
        assert!(text.contains("Conversational Chatbot"));
        assert!(text.contains(DEFAULT_GREETING));
        assert!(text.contains("Thinking..."));
        assert!(text.contains("Your question"));
    }

    #[test]
    fn test_render_pins_end_of_wrapped_reply() {
        let mut view = ChatView::new();
        view.apply(ServerMessage::Message {
            role: Role::User,
            content: "tell me a story".into(),
        });
        view.apply(ServerMessage::Message {
            role: Role::Assistant,
            content: format!("{}THE-END", "word ".repeat(300)),
        });
        let input = ChatInput::new();

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| render(f, &view, &input, "Conversational Chatbot", "subtitle"))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(ratatui::buffer::Cell::symbol).collect();
        assert!(text.contains("THE-END"));
        assert!(!text.contains("tell me a story"));
    }

    async fn recv(bridge: &mut TuiBridge) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(5), bridge.server_rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_pump_round_trip() {
        let model = ScriptedChatModel::with_replies(["Hi!"]);
        let manager = Arc::new(SessionManager::new(
            Conversation::new(model),
            MemoryHistoryStore::new(),
        ));
        let (mut bridge, session) = TuiBridge::new();
        tokio::spawn(session.run(manager, DEFAULT_SESSION_ID.to_string()));

        assert_eq!(
            recv(&mut bridge).await,
            ServerMessage::Message {
                role: Role::Assistant,
                content: DEFAULT_GREETING.into()
            }
        );

        bridge.submit("hello").unwrap();
        assert_eq!(
            recv(&mut bridge).await,
            ServerMessage::Message {
                role: Role::User,
                content: "hello".into()
            }
        );
        assert_eq!(recv(&mut bridge).await, ServerMessage::Thinking);
        assert_eq!(
            recv(&mut bridge).await,
            ServerMessage::Message {
                role: Role::Assistant,
                content: "Hi!".into()
            }
        );
        assert_eq!(recv(&mut bridge).await, ServerMessage::Idle);
    }
}
