//! # wol-web
//!
//! Linux adapters for the Wake-on-LAN relay.
//!
//! This crate provides:
//! - An Axum router exposing the device control plane from `wol-core`
//! - A blocking HTTP relay to the companion agent (reqwest)
//! - Host network identity and link probing standing in for the Wi-Fi radio
//! - The companion agent's router and OS power control
//!
//! ## Architecture
//!
//! - `routes::device` - `/wake`, `/sleep`, `/shutdown`, `/restart`, `/status`, `/logs`
//! - `routes::agent` - companion agent `/status`, `/sleep`, `/shutdown`, `/restart`
//!
//! Device handlers run the synchronous core on the blocking pool; the shared
//! device mutex keeps one request in flight at a time.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wol_web::create_device_router;
//!
//! let app = create_device_router(device);
//! let listener = TcpListener::bind("0.0.0.0:80").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod identity;
pub mod power;
pub mod relay;
pub mod routes;

// Re-exports
pub use identity::{HostIdentity, HostLink};
pub use power::{PowerControl, PowerError, SystemPower};
pub use relay::HttpRelay;
pub use routes::agent::{create_agent_router, AgentState};
pub use routes::device::create_device_router;
