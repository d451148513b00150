//! Device configuration.
//!
//! The configuration is loaded once at start and never mutated afterwards.
//! On Linux it comes from a JSON file (`config/device.json`); ESP32 builds
//! assemble it from build-time environment variables instead.
//!
//! The same file is shared by the device and the companion host agent, so
//! both sides agree on the token and the agent's port.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::magic_packet::parse_mac;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`DeviceConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is present but unusable.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Wi-Fi credentials.
    #[serde(default)]
    pub wifi: WifiSettings,

    /// Machine to wake.
    pub target: TargetSettings,

    /// Device HTTP surface and shared secret.
    pub esp: EspSettings,

    /// Companion agent on the target machine.
    pub host: HostSettings,

    /// Timing and sizing parameters.
    #[serde(default)]
    pub timing: Timing,
}

/// Wi-Fi station credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WifiSettings {
    pub ssid: String,

    /// Empty for open networks.
    #[serde(default)]
    pub password: String,
}

/// Wake-on-LAN target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Colon-hex hardware address, e.g. `AA:BB:CC:DD:EE:FF`.
    pub mac: String,

    /// Broadcast address of the target's segment.
    #[serde(default = "default_broadcast_ip")]
    pub broadcast_ip: String,

    /// UDP port for the magic packet.
    #[serde(default = "default_wol_port")]
    pub wol_port: u16,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            mac: String::new(),
            broadcast_ip: default_broadcast_ip(),
            wol_port: default_wol_port(),
        }
    }
}

/// Device-side HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspSettings {
    /// Shared secret required by every side-effecting route.
    pub token: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for EspSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_port: default_http_port(),
        }
    }
}

/// Companion agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Address of the controlled machine.
    #[serde(default)]
    pub ip: String,

    #[serde(default = "default_host_port")]
    pub port: u16,

    /// Peers allowed to call the agent. Empty allows everyone.
    #[serde(default)]
    pub allowed_ips: Vec<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            ip: String::new(),
            port: default_host_port(),
            allowed_ips: Vec::new(),
        }
    }
}

/// Fixed intervals, ceilings and sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Minimum time between two link checks.
    pub check_interval_ms: u32,

    /// Reconnect attempts tolerated before a restart.
    pub max_retries: u32,

    /// Bound on the blocking association at boot.
    pub initial_connect_timeout_ms: u32,

    /// Client-side timeout for relayed power commands.
    pub relay_timeout_ms: u32,

    /// Interval between heartbeat log entries.
    pub heartbeat_interval_ms: u32,

    /// Number of slots in the diagnostic log ring.
    pub log_capacity: usize,

    /// Longest stored log message, in bytes.
    pub max_message_len: usize,

    /// Entries returned by `/logs?json=true` when `count` is absent.
    pub default_log_count: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            check_interval_ms: 10_000,
            max_retries: 5,
            initial_connect_timeout_ms: 15_000,
            relay_timeout_ms: 5_000,
            heartbeat_interval_ms: 60_000,
            log_capacity: 50,
            max_message_len: 128,
            default_log_count: 10,
        }
    }
}

impl Timing {
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.relay_timeout_ms))
    }
}

fn default_broadcast_ip() -> String {
    "255.255.255.255".to_string()
}

fn default_wol_port() -> u16 {
    9
}

fn default_http_port() -> u16 {
    80
}

fn default_host_port() -> u16 {
    8888
}

impl DeviceConfig {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the device cannot operate with.
    ///
    /// A malformed target MAC is deliberately accepted here: it surfaces as a
    /// failed `/wake` request instead of preventing boot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.esp.token.is_empty() {
            return Err(ConfigError::Invalid("esp.token must not be empty".into()));
        }
        if self.target.wol_port == 0 {
            return Err(ConfigError::Invalid("target.wol_port must not be 0".into()));
        }
        if self.host.port == 0 {
            return Err(ConfigError::Invalid("host.port must not be 0".into()));
        }
        if self.timing.log_capacity == 0 {
            return Err(ConfigError::Invalid("timing.log_capacity must not be 0".into()));
        }
        if !self.host.ip.is_empty() && self.host.ip.parse::<Ipv4Addr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "host.ip is not an IPv4 address: {}",
                self.host.ip
            )));
        }
        Ok(())
    }

    /// Whether the configured target MAC parses.
    pub fn target_mac_is_valid(&self) -> bool {
        parse_mac(&self.target.mac).is_ok()
    }
}

/// The companion agent's view of the shared config file.
///
/// Only the token and the `host` section are read; everything else in the
/// file is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub esp: AgentSecret,

    #[serde(default)]
    pub host: HostSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSecret {
    #[serde(default)]
    pub token: String,
}

impl AgentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_json::from_str(text)?;
        if config.esp.token.is_empty() {
            return Err(ConfigError::Invalid("esp.token must not be empty".into()));
        }
        Ok(config)
    }
}
