//! roomchat configuration.
//!
//! TOML-based configuration with validation. All sections use defaults so
//! partial configs work out of the box.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    IdentityConfig, LogLevel, LoggingConfig, ReconnectConfig, RoomchatConfig, ServerConfig,
    CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use roomchat_common::ConfigError;

/// Load config from the platform default path, creating it if missing, and
/// validate the result.
pub fn load_config() -> Result<RoomchatConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<RoomchatConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}
