//! Configuration types for the alias updater
//!
//! The configuration is read once from a TOML file at startup, validated,
//! and then handed by reference to every component that needs it.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Firewall management API settings
    pub firewall: FirewallConfig,

    /// What to keep in sync
    pub sync: SyncConfig,

    /// Log settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.firewall.validate()?;
        self.sync.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Firewall management API settings
#[derive(Clone, Deserialize)]
pub struct FirewallConfig {
    /// API base URL (e.g. "https://192.168.1.1")
    pub host: String,

    /// API key (basic auth user)
    pub api_key: String,

    /// API secret (basic auth password)
    /// ⚠️ NEVER log this value
    pub api_secret: String,

    /// Verify the firewall's TLS certificate
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Perform reads only; log the writes that would have happened
    #[serde(default)]
    pub dry_run: bool,
}

// Custom Debug implementation that hides the API secret
impl std::fmt::Debug for FirewallConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirewallConfig")
            .field("host", &self.host)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<REDACTED>")
            .field("ssl_verify", &self.ssl_verify)
            .field("timeout_secs", &self.timeout_secs)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl FirewallConfig {
    /// Validate the firewall settings
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config("firewall.host cannot be empty"));
        }
        if !self.host.starts_with("https://") && !self.host.starts_with("http://") {
            return Err(Error::config(format!(
                "firewall.host must use an http or https scheme. Got: {}",
                self.host
            )));
        }
        if self.api_key.is_empty() {
            return Err(Error::config("firewall.api_key cannot be empty"));
        }
        if self.api_secret.is_empty() {
            return Err(Error::config("firewall.api_secret cannot be empty"));
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(Error::config(format!(
                "firewall.timeout_secs must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which command lists interface addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressCommand {
    /// `ifconfig <iface> inet6` (FreeBSD / OPNsense)
    #[default]
    Ifconfig,
    /// `ip -6 addr show dev <iface>` (Linux iproute2)
    Ip,
}

/// What to keep in sync
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Name of the firewall alias holding the prefix
    pub alias: String,

    /// Interface carrying the delegated prefix
    pub monitor_iface: String,

    /// Length the detected addresses are masked to
    #[serde(default = "default_prefix_length")]
    pub prefix_length: u8,

    /// Seconds to sleep between reconciliation cycles
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// How local addresses are listed
    #[serde(default)]
    pub address_command: AddressCommand,
}

impl SyncConfig {
    /// Validate the sync settings
    pub fn validate(&self) -> Result<()> {
        if self.alias.is_empty() {
            return Err(Error::config("sync.alias cannot be empty"));
        }
        if self.monitor_iface.is_empty() {
            return Err(Error::config("sync.monitor_iface cannot be empty"));
        }
        if self.prefix_length > 128 {
            return Err(Error::config(format!(
                "sync.prefix_length must be between 0 and 128. Got: {}",
                self.prefix_length
            )));
        }
        if self.check_interval == 0 {
            return Err(Error::config("sync.check_interval must be > 0"));
        }
        Ok(())
    }

    /// Interval between cycles as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }
}

/// Log settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error (case-insensitive)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file; stderr when absent
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Validate the log settings
    pub fn validate(&self) -> Result<()> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "warning" | "error" => Ok(()),
            _ => Err(Error::config(format!(
                "logging.level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                self.level
            ))),
        }
    }
}

fn default_ssl_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_prefix_length() -> u8 {
    64
}

fn default_check_interval() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}
