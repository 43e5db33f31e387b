use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::natpmp::gateway::default_gateway;

/// Path tried when no config file is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Gateway value that asks for default-route discovery
pub const AUTO_GATEWAY: &str = "auto";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub natpmp: NatPmpConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatPmpConfig {
    /// IPv4 address of the gateway, or "auto" to read the default route
    #[serde(default = "default_gateway_setting")]
    pub gateway: String,
    #[serde(default = "default_internal_port")]
    pub internal_port: u16,
    #[serde(default = "default_lease_seconds")]
    pub lease_seconds: u32,
    #[serde(default = "default_initial_timeout_ms")]
    pub initial_timeout_ms: u64,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u64,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_activity_window")]
    pub activity_window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for NatPmpConfig {
    fn default() -> Self {
        Self {
            gateway: default_gateway_setting(),
            internal_port: default_internal_port(),
            lease_seconds: default_lease_seconds(),
            initial_timeout_ms: default_initial_timeout_ms(),
            attempts: default_attempts(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_client_timeout(),
            username: None,
            password: None,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            activity_window_seconds: default_activity_window(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_gateway_setting() -> String {
    "10.2.0.1".to_string()
}

fn default_internal_port() -> u16 {
    1
}

fn default_lease_seconds() -> u32 {
    300 // 5 minutes
}

fn default_initial_timeout_ms() -> u64 {
    250 // RFC 6886 initial retransmission interval
}

fn default_attempts() -> u32 {
    4
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_client_timeout() -> u64 {
    10
}

fn default_activity_window() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl NatPmpConfig {
    /// Resolve the configured gateway to an address
    pub fn resolve_gateway(&self) -> Result<Ipv4Addr> {
        if self.gateway == AUTO_GATEWAY {
            return default_gateway().context("Failed to discover the default gateway");
        }
        self.gateway
            .parse()
            .context(format!("Invalid gateway address '{}'", self.gateway))
    }

    pub fn initial_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_timeout_ms)
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Username and password, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl LoggingConfig {
    /// Human readable output instead of JSON lines
    pub fn use_console(&self) -> bool {
        self.console || self.format == "console"
    }
}

impl HealthConfig {
    pub fn activity_window(&self) -> Duration {
        Duration::from_secs(self.activity_window_seconds)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Load an explicit config file, or `config.toml` if present, or defaults
    pub fn load(explicit: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let config = Self::from_file(&path)?;
            return Ok((config, Some(path)));
        }

        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            let config = Self::from_file(&fallback)?;
            return Ok((config, Some(fallback)));
        }

        let config = Config::default();
        config.validate()?;
        Ok((config, None))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate NAT-PMP config
        if self.natpmp.gateway != AUTO_GATEWAY && self.natpmp.gateway.parse::<Ipv4Addr>().is_err() {
            bail!(
                "Invalid gateway '{}'. Must be an IPv4 address or \"{}\"",
                self.natpmp.gateway,
                AUTO_GATEWAY
            );
        }

        if self.natpmp.internal_port == 0 {
            bail!("internal_port must be greater than 0");
        }

        // A zero lifetime asks the gateway to delete the mapping
        if self.natpmp.lease_seconds == 0 {
            bail!("lease_seconds must be greater than 0");
        }

        if self.natpmp.initial_timeout_ms == 0 {
            bail!("initial_timeout_ms must be greater than 0");
        }

        if !(1..=9).contains(&self.natpmp.attempts) {
            bail!(
                "attempts ({}) must be between 1 and 9",
                self.natpmp.attempts
            );
        }

        // Validate client config
        if self.client.endpoint.is_empty() {
            bail!("endpoint must not be empty");
        }

        if reqwest::Url::parse(&self.client.endpoint).is_err() {
            bail!("Invalid endpoint URL '{}'", self.client.endpoint);
        }

        if self.client.timeout_seconds == 0 {
            bail!("timeout_seconds must be greater than 0");
        }

        if self.client.username.is_some() != self.client.password.is_some() {
            bail!("username and password must be configured together");
        }

        // Validate health config
        if self.health.activity_window_seconds == 0 {
            bail!("activity_window_seconds must be greater than 0");
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
