//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# roomchat configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# url = "http://localhost:5000"   # http, https, ws or wss
# connect_timeout_secs = 10       # 1-120

[reconnect]
# max_attempts = 5                # 0-100, 0 disables reconnection
# initial_delay_ms = 1000         # 1-60000
# max_delay_ms = 1000             # >= initial_delay_ms; larger values enable backoff

[identity]
# display_name = ""               # empty joins anonymously

[logging]
# level = "INFO"                  # DEBUG, INFO, WARNING, ERROR
"##
}
