//! Chat message model.
//!
//! Inbound records come from a JavaScript service, so decoding is lenient:
//! the local-user flag may be named `isCurrentUser` or `isSelf`, the text may
//! be under `content` or `message`, and timestamps may be RFC 3339 strings or
//! epoch milliseconds.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Whether a message was written by a user or generated by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Chat,
    System,
}

/// A single entry in the message log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawMessage")]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Set when the local user sent the message. Display alignment only.
    #[serde(rename = "isSelf")]
    pub is_self: bool,
}

impl Message {
    /// A chat message from another user.
    pub fn chat(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Chat,
            sender: Some(sender.into()),
            content: content.into(),
            timestamp: None,
            is_self: false,
        }
    }

    /// A server-generated notice (joins, leaves, ...).
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::System,
            sender: None,
            content: content.into(),
            timestamp: None,
            is_self: false,
        }
    }

    #[must_use]
    pub fn with_self(mut self, is_self: bool) -> Self {
        self.is_self = is_self;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }

    /// `HH:MM` in local time, or an empty string when there is no timestamp.
    pub fn time_label(&self) -> String {
        self.timestamp
            .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
    #[serde(rename = "isSelf", default)]
    is_self: Option<bool>,
    #[serde(rename = "isCurrentUser", default)]
    is_current_user: Option<bool>,
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        let kind = match raw.kind.as_deref() {
            Some("system") => MessageKind::System,
            _ => MessageKind::Chat,
        };
        Self {
            kind,
            sender: raw.sender,
            content: raw.content.or(raw.message).unwrap_or_default(),
            timestamp: raw.timestamp.as_ref().and_then(parse_timestamp),
            is_self: raw.is_self.or(raw.is_current_user).unwrap_or(false),
        }
    }
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}
