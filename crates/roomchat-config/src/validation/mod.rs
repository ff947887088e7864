//! Full configuration validation.
//!
//! Checks numeric ranges and the server URL, collecting every problem into a
//! single `ConfigError`.

mod helpers;


use crate::schema::RoomchatConfig;
use roomchat_common::ConfigError;

use helpers::{validate_max_len, validate_range, validate_url_scheme};

/// Schemes accepted for `server.url`.
const URL_SCHEMES: &[&str] = &["http://", "https://", "ws://", "wss://"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RoomchatConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_url_scheme(&mut errors, "server.url", &config.server.url, URL_SCHEMES);
    validate_range(
        &mut errors,
        "server.connect_timeout_secs",
        config.server.connect_timeout_secs,
        1,
        120,
    );

    let reconnect = &config.reconnect;
    validate_range(
        &mut errors,
        "reconnect.max_attempts",
        reconnect.max_attempts,
        0,
        100,
    );
    validate_range(
        &mut errors,
        "reconnect.initial_delay_ms",
        reconnect.initial_delay_ms,
        1,
        60_000,
    );
    validate_range(
        &mut errors,
        "reconnect.max_delay_ms",
        reconnect.max_delay_ms,
        reconnect.initial_delay_ms,
        300_000,
    );

    validate_max_len(
        &mut errors,
        "identity.display_name",
        &config.identity.display_name,
        64,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
