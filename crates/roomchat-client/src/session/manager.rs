//! Session lifecycle: join, send, leave, and transport event handling.

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::protocol::InboundEvent;
use crate::transport::{Connector, DisconnectReason, ReconnectPolicy, TransportEvent};

use super::state::Session;
use super::types::{ConnectionStatus, SessionNotice, SessionSnapshot};

const NOTICE_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Connection Manager
// ---------------------------------------------------------------------------

/// Owns the current session and its transport.
///
/// A plain `&mut self` state machine: user operations and transport events
/// must be fed from one task. Every change is published as a
/// [`SessionSnapshot`] on a `watch` channel.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    policy: ReconnectPolicy,
    session: Option<Session>,
    state_tx: watch::Sender<SessionSnapshot>,
    notice_tx: broadcast::Sender<SessionNotice>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, policy: ReconnectPolicy) -> Self {
        let (state_tx, _) = watch::channel(SessionSnapshot::default());
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            connector,
            policy,
            session: None,
            state_tx,
            notice_tx,
        }
    }

    /// Receive every published snapshot. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notice_tx.subscribe()
    }

    /// A sender for the notice channel, so handles can subscribe later.
    pub fn notice_sender(&self) -> broadcast::Sender<SessionNotice> {
        self.notice_tx.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state_tx.borrow().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.session
            .as_ref()
            .map_or(ConnectionStatus::Disconnected, Session::status)
    }

    /// Whether a transport is open and may still deliver events.
    pub fn has_transport(&self) -> bool {
        self.session.as_ref().is_some_and(Session::has_transport)
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    // -- user operations ----------------------------------------------------

    /// Start a new session for `room_id`.
    ///
    /// The previous session's transport is closed before the new one is
    /// opened. An empty display name counts as anonymous.
    pub fn join(&mut self, room_id: &str, display_name: Option<&str>) -> Result<(), ClientError> {
        let room_id = room_id.trim();
        if room_id.is_empty() {
            return Err(ClientError::EmptyRoomId);
        }
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        if let Some(mut previous) = self.session.take() {
            debug!(room = %previous.room_id(), "Closing previous session");
            previous.close_transport();
        }

        info!(room = %room_id, anonymous = display_name.is_none(), "Joining room");
        let transport = self.connector.open(&self.policy);
        self.session = Some(Session::new(room_id.to_string(), display_name, transport));
        self.publish();
        Ok(())
    }

    /// Send chat text to the current room.
    pub fn send(&mut self, text: &str) -> Result<(), ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let result = match &self.session {
            Some(session) => session.send(text),
            None => Err(ClientError::NotConnected),
        };
        match result {
            Err(ClientError::TransportClosed) => {
                // The connection task ended before its last events were
                // handled: apply them, then drop the dead handle.
                self.process_pending();
                self.transport_ended();
                Err(ClientError::NotConnected)
            }
            other => other,
        }
    }

    /// Close the transport. The session and its log stay visible.
    pub fn leave(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.has_transport() || session.status() != ConnectionStatus::Disconnected {
            info!(room = %session.room_id(), "Leaving room");
            session.close_transport();
            self.publish();
        }
    }

    /// Leave and discard the session, publishing the empty snapshot.
    pub fn teardown(&mut self) {
        self.leave();
        if self.session.take().is_some() {
            debug!("Session discarded");
        }
        self.publish();
    }

    // -- transport events ---------------------------------------------------

    /// Wait for the next event from the current transport.
    ///
    /// Returns `None` when there is no transport or its task has ended; in
    /// the latter case the session is marked disconnected.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let transport = self.session.as_mut()?.transport_mut()?;
        match transport.recv().await {
            Some(event) => Some(event),
            None => {
                self.transport_ended();
                None
            }
        }
    }

    /// Handle every event already queued on the transport.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self
            .session
            .as_mut()
            .and_then(Session::transport_mut)
            .and_then(|t| t.try_recv())
        {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Drive the session until the transport goes away.
    pub async fn pump(&mut self) {
        while let Some(event) = self.next_event().await {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!(?event, "Event without a session");
            return;
        };

        match event {
            TransportEvent::Connected => {
                if let Err(e) = session.on_connected() {
                    warn!(error = %e, "Failed to announce room");
                    self.notify(SessionNotice::TransportError(e.to_string()));
                }
            }
            TransportEvent::Disconnected { reason } => {
                info!(room = %session.room_id(), ?reason, "Disconnected");
                session.on_disconnected();
                if reason == DisconnectReason::ServerDisconnect {
                    self.notify(SessionNotice::ServerClosed);
                }
            }
            TransportEvent::Inbound(InboundEvent::History(batch)) => session.on_history(batch),
            TransportEvent::Inbound(InboundEvent::Message(msg)) => session.on_message(msg),
            TransportEvent::Inbound(InboundEvent::Other { name }) => {
                debug!(event = %name, "Unhandled server event");
                return;
            }
            TransportEvent::Error(e) => {
                warn!(room = %session.room_id(), error = %e, "Transport error");
                self.notify(SessionNotice::TransportError(e));
                return;
            }
            TransportEvent::ReconnectFailed { attempts } => {
                warn!(room = %session.room_id(), attempts, "Reconnection exhausted");
                session.on_reconnect_failed();
                self.notify(SessionNotice::ReconnectExhausted { attempts });
            }
        }
        self.publish();
    }

    fn transport_ended(&mut self) {
        if let Some(session) = self.session.as_mut() {
            debug!(room = %session.room_id(), "Transport task ended");
            session.on_transport_ended();
            self.publish();
        }
    }

    fn publish(&self) {
        let snapshot = self
            .session
            .as_ref()
            .map(Session::snapshot)
            .unwrap_or_default();
        self.state_tx.send_replace(snapshot);
    }

    fn notify(&self, notice: SessionNotice) {
        // No subscribers is fine.
        let _ = self.notice_tx.send(notice);
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.close_transport();
        }
    }
}
