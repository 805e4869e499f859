//! Configuration management for the AdbShell client.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/adbshell/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("device host must not be empty")]
    EmptyHost,

    #[error("device port must be non-zero")]
    InvalidPort,

    #[error("{name} must be between 1 and 600000 milliseconds, got {value}")]
    InvalidTimeout { name: &'static str, value: u64 },

    #[error("max_retries must be between 1 and 100, got {0}")]
    InvalidMaxRetries(u32),

    #[error("key_name must not be empty or contain NUL bytes")]
    InvalidKeyName,

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the AdbShell client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Target device address.
    pub device: DeviceConfig,

    /// Timeouts and retry policy.
    pub connection: ConnectionConfig,

    /// Key provisioning settings.
    pub auth: AuthConfig,

    /// Logging settings.
    pub log: LogConfig,
}

/// Target device address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device host name or IP address.
    pub host: String,

    /// TCP port the device's debug daemon listens on.
    pub port: u16,
}

/// Timeouts and retry policy for establishing and using a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-read timeout in milliseconds, applied to every frame read.
    pub read_timeout_ms: u64,

    /// Timeout for the cheap reachability probe in milliseconds.
    pub probe_timeout_ms: u64,

    /// Maximum connection attempts before giving up.
    pub max_retries: u32,

    /// Fixed delay between connection attempts in milliseconds.
    pub retry_delay_ms: u64,
}

/// Key provisioning settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Directory holding the keypair. `None` uses the platform data
    /// directory.
    pub key_dir: Option<PathBuf>,

    /// Identifying name embedded in the public key blob, shown in the
    /// device's authorization dialog.
    pub key_name: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "172.20.10.2".to_string(),
            port: 5555,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 8_000,
            probe_timeout_ms: 5_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key_dir: None,
            key_name: protocol::DEFAULT_KEY_NAME.to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adbshell")
        .join("config.toml")
}

impl ClientConfig {
    /// TCP connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.connect_timeout_ms)
    }

    /// Per-read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.read_timeout_ms)
    }

    /// Reachability probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.probe_timeout_ms)
    }

    /// Delay between connection attempts as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.connection.retry_delay_ms)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - ADBSHELL_HOST: Override the device host
    /// - ADBSHELL_PORT: Override the device port
    /// - ADBSHELL_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ADBSHELL_HOST") {
            if !host.is_empty() {
                tracing::info!("Overriding device host from environment: {}", host);
                self.device.host = host;
            }
        }

        if let Ok(port) = std::env::var("ADBSHELL_PORT") {
            match port.parse::<u16>() {
                Ok(port) if port != 0 => {
                    tracing::info!("Overriding device port from environment: {}", port);
                    self.device.port = port;
                }
                _ => tracing::warn!("Ignoring invalid ADBSHELL_PORT value: {}", port),
            }
        }

        if let Ok(level) = std::env::var("ADBSHELL_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.log.level = level;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.device.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        for (name, value) in [
            ("connect_timeout_ms", self.connection.connect_timeout_ms),
            ("read_timeout_ms", self.connection.read_timeout_ms),
            ("probe_timeout_ms", self.connection.probe_timeout_ms),
        ] {
            if value < 1 || value > 600_000 {
                return Err(ConfigError::InvalidTimeout { name, value });
            }
        }

        if self.connection.max_retries < 1 || self.connection.max_retries > 100 {
            return Err(ConfigError::InvalidMaxRetries(self.connection.max_retries));
        }

        if self.auth.key_name.is_empty() || self.auth.key_name.contains('\0') {
            return Err(ConfigError::InvalidKeyName);
        }

        let level = self.log.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log.level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    ///
    /// The default path is `~/.config/adbshell/config.toml`.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
