//! # wol-core
//!
//! Control plane of a network-triggered Wake-on-LAN relay.
//!
//! This crate provides:
//! - Device configuration and timing constants
//! - A bounded, newest-first diagnostic log
//! - Magic packet construction and UDP broadcast
//! - Power-command relay requests for the companion agent
//! - Token-checked request dispatch producing framework-neutral replies
//! - The Wi-Fi connectivity state machine and control loop
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! making it usable on both Linux (tokio) and ESP32 (esp-idf) targets.
//! Platform crates supply the collaborators behind the [`dispatcher::Ports`]
//! and [`connectivity::Radio`] traits.

pub mod clock;
pub mod config;
pub mod connectivity;
pub mod control;
pub mod dispatcher;
pub mod log_store;
pub mod magic_packet;
pub mod messages;
pub mod relay;
pub mod request;

pub use clock::{BootClock, Clock};
pub use config::{AgentConfig, ConfigError, DeviceConfig, Timing};
pub use connectivity::{ConnectionState, ConnectivityFailure, ConnectivityManager, LinkStatus, Radio, RadioError};
pub use control::{lock_device, ControlLoop};
pub use dispatcher::{
    check_token, AuthError, BlinkPattern, ContentType, Device, Indicator, NetworkIdentity, Ports, Reply,
    SharedDevice, TraceIndicator,
};
pub use log_store::{EventLog, LogEntry, LogLevel, LogStore};
pub use magic_packet::{
    build_magic_packet, parse_mac, send_wake, MacAddress, MagicPacket, TransportError, UdpWakeTransport, WakeTransport,
    MAGIC_PACKET_LEN,
};
pub use relay::{HostRelay, PowerAction, RelayError, RelayRequest};
pub use request::{Action, CommandRequest};
