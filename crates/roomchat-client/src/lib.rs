//! Client-side chat session for a room-based Socket.IO chat service.
//!
//! [`ChatClient`] runs a [`ConnectionManager`] in a background task: join a
//! room, send text, leave. State is published as [`SessionSnapshot`]s for a
//! [`ViewAdapter`] to render.

pub mod client;
pub mod error;
pub mod log;
pub mod message;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ChatClient;
pub use error::ClientError;
pub use log::MessageLog;
pub use message::{Message, MessageKind};
pub use protocol::{InboundEvent, JoinRoomPayload, OutboundEvent, SendMessagePayload};
pub use session::{ConnectionManager, ConnectionStatus, SessionNotice, SessionSnapshot};
pub use transport::{
    Connector, DisconnectReason, ReconnectPolicy, SocketIoConnector, Transport, TransportEvent,
};
pub use view::{run_view, ViewAdapter, ViewIntent};
