//! Observable session state published to views.

use std::sync::Arc;

use crate::message::Message;

/// Connection state of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable copy of the session, published on every change.
///
/// The default value is the "no session" snapshot: empty room, no messages,
/// disconnected. `messages` is shared with the session's log, so cloning a
/// snapshot does not copy messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub room_id: String,
    pub display_name: Option<String>,
    pub status: ConnectionStatus,
    pub messages: Arc<[Message]>,
    /// Automatic reconnection gave up; only a new join reconnects.
    pub reconnect_exhausted: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            room_id: String::new(),
            display_name: None,
            status: ConnectionStatus::Disconnected,
            messages: Arc::from(Vec::new()),
            reconnect_exhausted: false,
        }
    }
}

impl SessionSnapshot {
    /// Whether a room is joined (in any connection state).
    pub fn has_session(&self) -> bool {
        !self.room_id.is_empty()
    }
}

/// One-shot events for the view that are not part of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// A non-terminal transport failure.
    TransportError(String),
    /// The server ended the session; no reconnection follows.
    ServerClosed,
    /// Automatic reconnection gave up.
    ReconnectExhausted { attempts: u32 },
}

impl std::fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionNotice::TransportError(e) => write!(f, "connection problem: {e}"),
            SessionNotice::ServerClosed => f.write_str("the server closed the session"),
            SessionNotice::ReconnectExhausted { attempts } => write!(
                f,
                "could not reconnect after {attempts} attempts; join again to retry"
            ),
        }
    }
}
