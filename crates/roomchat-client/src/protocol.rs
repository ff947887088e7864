//! Application-level events exchanged with the chat service.
//!
//! These ride inside Socket.IO event packets. The Engine.IO / Socket.IO
//! framing is handled by `transport::codec`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ClientError;
use crate::message::Message;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Socket.IO event names used by the chat service.
pub mod events {
    pub const JOIN_ROOM: &str = "join_room";
    pub const SEND_MESSAGE: &str = "send_message";
    pub const MESSAGE_HISTORY: &str = "message_history";
    pub const RECEIVE_MESSAGE: &str = "receive_message";
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// Payload for `join_room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomPayload {
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

/// Payload for `send_message`.
///
/// The text is carried under both `message` and `content`; services read
/// either key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    pub room: String,
    pub message: String,
    pub content: String,
}

impl SendMessagePayload {
    pub fn new(room: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            room: room.into(),
            message: text.clone(),
            content: text,
        }
    }
}

/// Events the client emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    JoinRoom(JoinRoomPayload),
    SendMessage(SendMessagePayload),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::JoinRoom(_) => events::JOIN_ROOM,
            OutboundEvent::SendMessage(_) => events::SEND_MESSAGE,
        }
    }

    pub fn payload(&self) -> Result<serde_json::Value, ClientError> {
        let value = match self {
            OutboundEvent::JoinRoom(p) => serde_json::to_value(p)?,
            OutboundEvent::SendMessage(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// Events received from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Prior messages, sent right after `join_room`.
    History(Vec<Message>),
    /// One live message.
    Message(Message),
    /// An event this client does not handle.
    Other { name: String },
}

impl InboundEvent {
    /// Decode a Socket.IO event by name and arguments.
    ///
    /// Malformed entries inside a history batch are skipped; a malformed
    /// single message is an error.
    pub fn decode(name: &str, args: &[serde_json::Value]) -> Result<Self, ClientError> {
        match name {
            events::MESSAGE_HISTORY => {
                let entries = args
                    .first()
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| {
                        ClientError::Protocol("message_history payload is not an array".into())
                    })?;
                let batch = entries
                    .iter()
                    .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                        Ok(msg) => Some(msg),
                        Err(e) => {
                            warn!(error = %e, "Skipping malformed history entry");
                            None
                        }
                    })
                    .collect();
                Ok(InboundEvent::History(batch))
            }
            events::RECEIVE_MESSAGE => {
                let value = args.first().cloned().ok_or_else(|| {
                    ClientError::Protocol("receive_message without payload".into())
                })?;
                let msg = serde_json::from_value(value).map_err(|e| {
                    ClientError::Protocol(format!("malformed receive_message: {e}"))
                })?;
                Ok(InboundEvent::Message(msg))
            }
            other => Ok(InboundEvent::Other {
                name: other.to_string(),
            }),
        }
    }
}
