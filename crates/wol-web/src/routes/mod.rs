//! HTTP route handlers.
//!
//! Two independent routers live here: the device control plane and the
//! companion agent that runs on the machine being controlled.

pub mod agent;
pub mod device;
