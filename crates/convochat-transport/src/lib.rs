//! Transport layer for web and TUI interfaces.
//!
//! Provides:
//! - Wire protocol (tagged JSON)
//! - WebSocket + HTTP transport (feature: websocket)
//! - TUI transport bridge (feature: tui)

pub mod protocol;

#[cfg(feature = "websocket")]
pub mod http;
#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "tui")]
pub mod tui;

pub use protocol::{ClientMessage, ServerMessage};

#[cfg(feature = "websocket")]
pub use websocket::create_router;
