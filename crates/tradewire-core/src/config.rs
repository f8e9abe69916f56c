//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/tradewire/config.toml)
//! 3. Environment variables (TRADEWIRE_* prefix)
//!
//! Environment variables take precedence over config file values. The
//! configuration is never written back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "TRADEWIRE";

/// Default server endpoint
pub const DEFAULT_URL: &str = "ws://localhost:8080/ws";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket endpoint of the data server
    #[serde(default = "default_url")]
    pub url: String,

    /// Fixed delay before each reconnect attempt, in seconds
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// How long an entry alert stays on screen, in seconds
    #[serde(default = "default_alert_timeout_secs")]
    pub alert_timeout_secs: u64,

    /// Whether OS-level notifications may be requested
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            alert_timeout_secs: default_alert_timeout_secs(),
            notifications: default_notifications(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TRADEWIRE_URL, TRADEWIRE_RECONNECT_DELAY_SECS,
    ///    TRADEWIRE_NOTIFICATIONS)
    /// 2. Config file (~/.config/tradewire/config.toml or TRADEWIRE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TRADEWIRE_URL
        if let Ok(val) = std::env::var(format!("{}_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.url = val;
            }
        }

        // TRADEWIRE_RECONNECT_DELAY_SECS
        if let Ok(val) = std::env::var(format!("{}_RECONNECT_DELAY_SECS", ENV_PREFIX)) {
            match val.parse() {
                Ok(secs) => self.reconnect_delay_secs = secs,
                Err(_) => tracing::warn!(
                    "Ignoring {}_RECONNECT_DELAY_SECS={:?}: not a number",
                    ENV_PREFIX,
                    val
                ),
            }
        }

        // TRADEWIRE_NOTIFICATIONS
        if let Ok(val) = std::env::var(format!("{}_NOTIFICATIONS", ENV_PREFIX)) {
            self.notifications = val.eq_ignore_ascii_case("true") || val == "1";
        }
    }

    /// Get the config file path
    ///
    /// Can be overridden with TRADEWIRE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tradewire")
            .join("config.toml")
    }

    /// Delay between a disconnect and the next connection attempt
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Auto-dismiss timeout for entry alerts
    pub fn alert_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_timeout_secs)
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

fn default_alert_timeout_secs() -> u64 {
    10
}

fn default_notifications() -> bool {
    true
}
