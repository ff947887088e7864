//! Core TOML config loading: read from path or platform default.

use std::io::ErrorKind;
use std::path::Path;

use roomchat_common::ConfigError;
use tracing::{debug, info, warn};

use crate::schema::RoomchatConfig;
use crate::validation;

use super::paths::{create_default_config, default_config_path};

/// Parse config text. `origin` names the source in error messages.
///
/// Missing sections and fields take their defaults. Values are not
/// validated here.
pub fn parse_config(content: &str, origin: &str) -> Result<RoomchatConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("{origin}: {e}")))
}

/// Load config from a specific TOML file path.
///
/// A config that parses but fails validation is returned with a warning;
/// [`crate::load_config_from`] is the strict entry point.
pub fn load_from_path(path: &Path) -> Result<RoomchatConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let config = parse_config(&content, &path.display().to_string())?;
    match validation::validate(&config) {
        Ok(()) => debug!(path = %path.display(), "Config is valid"),
        Err(e) => warn!(path = %path.display(), error = %e, "Config has invalid values"),
    }

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/roomchat/config.toml`
/// On macOS: `~/Library/Application Support/roomchat/config.toml`
///
/// A missing file is created from the commented template and the defaults
/// are returned.
pub fn load_default() -> Result<RoomchatConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "No config found, writing default");
            create_default_config(&path)?;
            Ok(RoomchatConfig::default())
        }
        other => other,
    }
}
