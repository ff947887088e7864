//! Transport handle, events, and reconnection policy.
//!
//! A [`Transport`] is the session-side end of one connection: outbound
//! commands go through an unbounded channel so emitting never blocks the
//! caller, and lifecycle/inbound events come back on a second channel. The
//! far end ([`TransportRemote`]) is driven either by the Socket.IO connection
//! loop or, in tests, directly.

pub mod codec;
mod socketio;

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::protocol::{InboundEvent, OutboundEvent};

pub use socketio::{socket_url, SocketIoConnector};

// ---------------------------------------------------------------------------
// Reconnection Policy
// ---------------------------------------------------------------------------

/// Bounded automatic reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before giving up. Zero disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the delay. Equal to `initial_delay` means fixed.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_millis(1000))
    }
}

impl ReconnectPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling from
    /// `initial_delay` and capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.max(self.initial_delay);
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .map_or(cap, |d| d.min(cap))
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Why a connected transport went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the WebSocket or sent an Engine.IO close.
    TransportClosed,
    /// The WebSocket failed mid-session.
    TransportError,
    /// No traffic within the ping window.
    PingTimeout,
    /// The server disconnected the socket; no reconnection follows.
    ServerDisconnect,
}

/// Events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The server acknowledged the socket connection.
    Connected,
    /// A connected socket went down.
    Disconnected { reason: DisconnectReason },
    /// An application event from the server.
    Inbound(InboundEvent),
    /// A non-terminal failure (refused connection, bad packet, ...).
    Error(String),
    /// Reconnection gave up after `attempts` retries.
    ReconnectFailed { attempts: u32 },
}

/// Commands sent to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Emit(OutboundEvent),
    Close,
}

// ---------------------------------------------------------------------------
// Transport Handle
// ---------------------------------------------------------------------------

/// Session-side handle for one connection.
///
/// Closing (or dropping) the handle stops the connection and closes the
/// event channel, so nothing sent afterwards can be observed.
#[derive(Debug)]
pub struct Transport {
    commands: mpsc::UnboundedSender<TransportCommand>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    closed: bool,
}

/// The far end of a [`Transport`].
#[derive(Debug)]
pub struct TransportRemote {
    pub commands: mpsc::UnboundedReceiver<TransportCommand>,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl Transport {
    /// Create a connected handle/remote pair.
    pub fn channel() -> (Transport, TransportRemote) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Transport {
                commands: command_tx,
                events: event_rx,
                closed: false,
            },
            TransportRemote {
                commands: command_rx,
                events: event_tx,
            },
        )
    }

    pub fn emit(&self, event: OutboundEvent) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::TransportClosed);
        }
        self.commands
            .send(TransportCommand::Emit(event))
            .map_err(|_| ClientError::TransportClosed)
    }

    /// Stop the connection and stop listening. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.commands.send(TransportCommand::Close);
        self.events.close();
    }

    /// An event that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.events.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next event, or `None` once the handle is closed or the connection
    /// task has ended.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens transports for new sessions.
pub trait Connector: Send + 'static {
    fn open(&mut self, policy: &ReconnectPolicy) -> Transport;
}
