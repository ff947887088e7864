//! State of one joined room, from join to leave.

use tracing::{debug, info};

use crate::error::ClientError;
use crate::log::MessageLog;
use crate::message::Message;
use crate::protocol::{JoinRoomPayload, OutboundEvent, SendMessagePayload};
use crate::transport::Transport;

use super::types::{ConnectionStatus, SessionSnapshot};

/// Client-side state for one room.
///
/// Owns its message log and its transport. A new join builds a new
/// `Session`; nothing carries over.
#[derive(Debug)]
pub(crate) struct Session {
    room_id: String,
    display_name: Option<String>,
    status: ConnectionStatus,
    log: MessageLog,
    transport: Option<Transport>,
    /// Log length at the latest connect; later entries are live messages.
    live_start: usize,
    reconnect_exhausted: bool,
}

impl Session {
    pub(crate) fn new(room_id: String, display_name: Option<String>, transport: Transport) -> Self {
        Self {
            room_id,
            display_name,
            status: ConnectionStatus::Connecting,
            log: MessageLog::new(),
            transport: Some(transport),
            live_start: 0,
            reconnect_exhausted: false,
        }
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub(crate) fn room_id(&self) -> &str {
        &self.room_id
    }

    pub(crate) fn transport_mut(&mut self) -> Option<&mut Transport> {
        self.transport.as_mut()
    }

    pub(crate) fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    // -- transport lifecycle ------------------------------------------------

    /// The server acknowledged the connection: announce the room.
    pub(crate) fn on_connected(&mut self) -> Result<(), ClientError> {
        self.status = ConnectionStatus::Connected;
        self.live_start = self.log.len();
        self.reconnect_exhausted = false;
        info!(room = %self.room_id, "Connected; joining room");

        let join = OutboundEvent::JoinRoom(JoinRoomPayload {
            room_id: self.room_id.clone(),
            user_name: self.display_name.clone(),
        });
        match &self.transport {
            Some(transport) => transport.emit(join),
            None => Err(ClientError::TransportClosed),
        }
    }

    pub(crate) fn on_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    pub(crate) fn on_reconnect_failed(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.reconnect_exhausted = true;
    }

    /// The connection task ended; forget the handle.
    pub(crate) fn on_transport_ended(&mut self) {
        self.transport = None;
        self.status = ConnectionStatus::Disconnected;
    }

    /// Close the transport and stop listening to it. Idempotent.
    pub(crate) fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.status = ConnectionStatus::Disconnected;
    }

    // -- inbound ------------------------------------------------------------

    /// Install the history batch.
    ///
    /// Replaces the log unless live messages arrived since the latest
    /// connect; those are kept after the batch unless the batch already
    /// holds them.
    pub(crate) fn on_history(&mut self, batch: Vec<Message>) {
        if !self.status.is_connected() {
            debug!(room = %self.room_id, "Ignoring history while not connected");
            return;
        }
        let live = self.log.since(self.live_start);
        let merged = if live.is_empty() {
            batch
        } else {
            let extra: Vec<Message> = live
                .iter()
                .filter(|m| !batch.contains(m))
                .cloned()
                .collect();
            let mut merged = batch;
            merged.extend(extra);
            merged
        };
        debug!(room = %self.room_id, count = merged.len(), "History installed");
        self.log.replace(merged);
        self.live_start = 0;
    }

    pub(crate) fn on_message(&mut self, msg: Message) {
        if !self.status.is_connected() {
            debug!(room = %self.room_id, "Ignoring message while not connected");
            return;
        }
        self.log.push(msg);
    }

    // -- outbound -----------------------------------------------------------

    /// Emit chat text. The log is not touched; the server echoes it back.
    pub(crate) fn send(&self, text: &str) -> Result<(), ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        if !self.status.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let transport = self.transport.as_ref().ok_or(ClientError::NotConnected)?;
        transport.emit(OutboundEvent::SendMessage(SendMessagePayload::new(
            self.room_id.as_str(),
            text,
        )))
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room_id: self.room_id.clone(),
            display_name: self.display_name.clone(),
            status: self.status,
            messages: self.log.shared(),
            reconnect_exhausted: self.reconnect_exhausted,
        }
    }
}
