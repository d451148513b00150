//! Build-time configuration for ESP32.
//!
//! There is no file system to read a config file from, so the values are
//! baked in from environment variables at compile time:
//!
//! | Variable            | Field               |
//! |---------------------|---------------------|
//! | `WOL_WIFI_SSID`     | `wifi.ssid`         |
//! | `WOL_WIFI_PASSWORD` | `wifi.password`     |
//! | `WOL_TARGET_MAC`    | `target.mac`        |
//! | `WOL_BROADCAST_IP`  | `target.broadcast_ip` |
//! | `WOL_TOKEN`         | `esp.token`         |
//! | `WOL_HOST_IP`       | `host.ip`           |
//! | `WOL_HOST_PORT`     | `host.port`         |

use wol_core::config::{EspSettings, HostSettings, TargetSettings, WifiSettings};
use wol_core::{ConfigError, DeviceConfig, Timing};

/// Assemble and validate the configuration baked into the firmware.
pub fn build_time_config() -> Result<DeviceConfig, ConfigError> {
    let mut config = DeviceConfig {
        wifi: WifiSettings {
            ssid: option_env!("WOL_WIFI_SSID").unwrap_or_default().to_string(),
            password: option_env!("WOL_WIFI_PASSWORD").unwrap_or_default().to_string(),
        },
        target: TargetSettings {
            mac: option_env!("WOL_TARGET_MAC").unwrap_or_default().to_string(),
            ..Default::default()
        },
        esp: EspSettings {
            token: option_env!("WOL_TOKEN").unwrap_or_default().to_string(),
            ..Default::default()
        },
        host: HostSettings {
            ip: option_env!("WOL_HOST_IP").unwrap_or_default().to_string(),
            ..Default::default()
        },
        timing: Timing::default(),
    };

    if let Some(broadcast_ip) = option_env!("WOL_BROADCAST_IP") {
        config.target.broadcast_ip = broadcast_ip.to_string();
    }
    if let Some(port) = option_env!("WOL_HOST_PORT") {
        config.host.port = port
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("WOL_HOST_PORT is not a port: {}", port)))?;
    }

    config.validate()?;
    Ok(config)
}
