//! Engine.IO v4 and Socket.IO v5 text packet codec.
//!
//! Every WebSocket text frame is one Engine.IO packet: a type digit followed
//! by its data. Engine.IO `message` packets carry one Socket.IO packet:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][<json>]
//! ```
//!
//! Binary attachments are not supported.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// The namespace used when a packet carries none.
pub const DEFAULT_NAMESPACE: &str = "/";

// ---------------------------------------------------------------------------
// Engine.IO
// ---------------------------------------------------------------------------

/// Body of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the connection may stay silent before it is considered dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self, ClientError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ClientError::Protocol("empty engine packet".into()))?;
        let data = chars.as_str();
        match kind {
            '0' => {
                let handshake = serde_json::from_str(data)
                    .map_err(|e| ClientError::Protocol(format!("bad open packet: {e}")))?;
                Ok(EnginePacket::Open(handshake))
            }
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data.to_string())),
            '3' => Ok(EnginePacket::Pong(data.to_string())),
            '4' => Ok(EnginePacket::Message(data.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ClientError::Protocol(format!(
                "unknown engine packet type {other:?}"
            ))),
        }
    }

    pub fn encode(&self) -> Result<String, ClientError> {
        let text = match self {
            EnginePacket::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        };
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Socket.IO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<serde_json::Value>),
    Disconnect,
    Event {
        name: String,
        args: Vec<serde_json::Value>,
        ack_id: Option<u64>,
    },
    Ack {
        ack_id: u64,
        args: Vec<serde_json::Value>,
    },
    ConnectError(serde_json::Value),
}

/// A Socket.IO packet together with its namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketFrame {
    pub namespace: String,
    pub packet: SocketPacket,
}

impl SocketFrame {
    pub fn decode(text: &str) -> Result<Self, ClientError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ClientError::Protocol("empty socket packet".into()))?;
        let mut rest = chars.as_str();

        if kind == '5' || kind == '6' {
            return Err(ClientError::Protocol(
                "binary socket packets are not supported".into(),
            ));
        }

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(idx) => {
                    let ns = &rest[..idx];
                    rest = &rest[idx + 1..];
                    ns.to_string()
                }
                None => {
                    let ns = rest.to_string();
                    rest = "";
                    ns
                }
            }
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| ClientError::Protocol(format!("bad ack id: {e}")))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<serde_json::Value>(rest)
                    .map_err(|e| ClientError::Protocol(format!("bad packet data: {e}")))?,
            )
        };

        let packet = match kind {
            '0' => SocketPacket::Connect(data),
            '1' => SocketPacket::Disconnect,
            '2' => {
                let mut items = into_array(data)?;
                if items.is_empty() {
                    return Err(ClientError::Protocol("event without a name".into()));
                }
                let name = match items.remove(0) {
                    serde_json::Value::String(name) => name,
                    other => {
                        return Err(ClientError::Protocol(format!(
                            "event name is not a string: {other}"
                        )))
                    }
                };
                SocketPacket::Event {
                    name,
                    args: items,
                    ack_id,
                }
            }
            '3' => {
                let ack_id =
                    ack_id.ok_or_else(|| ClientError::Protocol("ack without id".into()))?;
                SocketPacket::Ack {
                    ack_id,
                    args: into_array(data)?,
                }
            }
            '4' => SocketPacket::ConnectError(data.unwrap_or(serde_json::Value::Null)),
            other => {
                return Err(ClientError::Protocol(format!(
                    "unknown socket packet type {other:?}"
                )))
            }
        };

        Ok(SocketFrame { namespace, packet })
    }
}

impl SocketPacket {
    /// Encode for the default namespace.
    pub fn encode(&self) -> Result<String, ClientError> {
        let text = match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", serde_json::to_string(auth)?),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args, ack_id } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(serde_json::Value::String(name.clone()));
                items.extend(args.iter().cloned());
                let id = ack_id.map(|id| id.to_string()).unwrap_or_default();
                format!("2{id}{}", serde_json::to_string(&items)?)
            }
            SocketPacket::Ack { ack_id, args } => {
                format!("3{ack_id}{}", serde_json::to_string(args)?)
            }
            SocketPacket::ConnectError(data) => format!("4{}", serde_json::to_string(data)?),
        };
        Ok(text)
    }
}

fn into_array(data: Option<serde_json::Value>) -> Result<Vec<serde_json::Value>, ClientError> {
    match data {
        Some(serde_json::Value::Array(items)) => Ok(items),
        Some(other) => Err(ClientError::Protocol(format!(
            "expected a JSON array, got {other}"
        ))),
        None => Ok(Vec::new()),
    }
}

/// Wrap a Socket.IO packet into the Engine.IO message frame that carries it.
pub fn message_frame(packet: &SocketPacket) -> Result<String, ClientError> {
    EnginePacket::Message(packet.encode()?).encode()
}

/// Engine.IO frame for a Socket.IO event on the default namespace.
pub fn event_frame(name: &str, payload: serde_json::Value) -> Result<String, ClientError> {
    message_frame(&SocketPacket::Event {
        name: name.to_string(),
        args: vec![payload],
        ack_id: None,
    })
}
