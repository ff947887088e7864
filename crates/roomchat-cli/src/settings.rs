//! Effective settings: config file values with command-line overrides.

use std::time::Duration;

use roomchat_client::ReconnectPolicy;
use roomchat_config::{ReconnectConfig, RoomchatConfig};

use crate::Args;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub connect_timeout: Duration,
    pub policy: ReconnectPolicy,
    pub display_name: Option<String>,
    pub room: Option<String>,
    pub log_directive: String,
}

impl Settings {
    pub fn resolve(config: &RoomchatConfig, args: &Args) -> Self {
        let display_name = args
            .name
            .as_deref()
            .unwrap_or(&config.identity.display_name)
            .trim();
        Self {
            server_url: args
                .url
                .clone()
                .unwrap_or_else(|| config.server.url.clone()),
            connect_timeout: Duration::from_secs(u64::from(config.server.connect_timeout_secs)),
            policy: reconnect_policy(&config.reconnect),
            display_name: (!display_name.is_empty()).then(|| display_name.to_string()),
            room: args.room.clone().filter(|r| !r.trim().is_empty()),
            log_directive: args
                .log_level
                .clone()
                .unwrap_or_else(|| config.logging.level.directive().to_string()),
        }
    }
}

pub fn reconnect_policy(config: &ReconnectConfig) -> ReconnectPolicy {
    ReconnectPolicy {
        max_attempts: config.max_attempts,
        initial_delay: Duration::from_millis(u64::from(config.initial_delay_ms)),
        max_delay: Duration::from_millis(u64::from(config.max_delay_ms)),
    }
}
