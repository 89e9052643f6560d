//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names; CLI flags
//! override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "127.0.0.1:3000"        # Address the conversion service listens on
//! max_upload_bytes = 52428800    # Request body limit (50 MiB)
//!
//! [client]
//! server_url = "http://127.0.0.1:3000"
//! progress_interval_ms = 200     # Tick of the decorative progress animation
//! connect_timeout_secs = 10
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Conversion service settings.
    pub server: ServerConfig,
    /// Batch client settings.
    pub client: ClientConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_bytes must be non-zero".into(),
            ));
        }
        if !(self.client.server_url.starts_with("http://")
            || self.client.server_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(
                "client.server_url must start with http:// or https://".into(),
            ));
        }
        if self.client.progress_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "client.progress_interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Conversion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|_| {
            ConfigError::Validation(format!("server.bind is not a socket address: {}", self.bind))
        })
    }
}

/// Batch client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the conversion service.
    pub server_url: String,
    /// Interval of the decorative progress ticker, in milliseconds.
    pub progress_interval_ms: u64,
    /// TCP connect timeout for conversion requests.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            progress_interval_ms: 200,
            connect_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file path.
///
/// A missing file is not an error when `required` is false; stock defaults
/// are returned instead.
pub fn load_config(path: &Path, required: bool) -> Result<AppConfig, ConfigError> {
    if !path.exists() && !required {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "loaded config file");
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Converter Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Conversion service (`image-converter serve`)
# ---------------------------------------------------------------------------
[server]
# Socket address to listen on.
bind = "127.0.0.1:3000"

# Maximum request body size in bytes (50 MiB).
max_upload_bytes = 52428800

# ---------------------------------------------------------------------------
# Batch client (`image-converter convert`)
# ---------------------------------------------------------------------------
[client]
# Base URL of the conversion service.
server_url = "http://127.0.0.1:3000"

# Tick of the progress animation shown while a file converts, in ms.
# The animation is decorative: it does not measure upload or codec progress.
progress_interval_ms = 200

# TCP connect timeout for conversion requests, in seconds.
connect_timeout_secs = 10
"##
}
