//! ESP32 adapters for the Wake-on-LAN relay.
//!
//! This crate provides the platform side of the `wol-core` seams:
//! - WiFi station radio and network identity
//! - Build-time configuration
//! - HTTP server forwarding every GET to the core dispatcher
//! - Relay client for the companion agent
//! - Status LED
//!
//! # Example
//!
//! ```ignore
//! use wol_esp32::wifi::{shared_wifi, EspRadio};
//!
//! let wifi = shared_wifi(peripherals.modem, sysloop, nvs)?;
//! let mut control = ControlLoop::new(device.clone(), EspRadio::new(wifi), Box::new(BootClock::new()));
//! ```

pub mod config;
pub mod http;
pub mod led;
pub mod relay;
pub mod wifi;
