//! Configuration schema types for roomchat.
//!
//! All structs use `serde(default)` so partial configs work correctly.

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// Server Config
// =============================================================================

/// Messaging service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the Socket.IO server (http, https, ws or wss).
    pub url: String,
    /// Seconds to wait for the WebSocket handshake (valid range: 1-120).
    pub connect_timeout_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".into(),
            connect_timeout_secs: 10,
        }
    }
}

// =============================================================================
// Reconnect Config
// =============================================================================

/// Automatic reconnection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Consecutive failed attempts before giving up (valid range: 0-100).
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u32,
    /// Upper bound for the retry delay. Equal to `initial_delay_ms` means a
    /// fixed delay; larger values double the delay on each attempt.
    pub max_delay_ms: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 1000,
        }
    }
}

// =============================================================================
// Identity Config
// =============================================================================

/// Defaults for the local user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Name sent with `join_room`. Empty means anonymous.
    pub display_name: String,
}

// =============================================================================
// Logging Config
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// `tracing-subscriber` filter directive for the roomchat crates.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "roomchat=debug,roomchat_client=debug,roomchat_config=debug",
            LogLevel::Info => "roomchat=info,roomchat_client=info,roomchat_config=info",
            LogLevel::Warning => "roomchat=warn,roomchat_client=warn,roomchat_config=warn",
            LogLevel::Error => "roomchat=error,roomchat_client=error,roomchat_config=error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

// =============================================================================
// Root
// =============================================================================

/// Top-level roomchat configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomchatConfig {
    pub server: ServerConfig,
    pub reconnect: ReconnectConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}
