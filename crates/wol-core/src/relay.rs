//! Power commands relayed to the companion agent.
//!
//! Each command is one HTTP GET to
//! `http://<host.ip>:<host.port>/<action>?token=<secret>`, bounded by a
//! client-side timeout. Only a 200 counts as success. The relay never
//! retries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A power-state change executed by the companion agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    Sleep,
    Shutdown,
    Restart,
}

impl PowerAction {
    pub const ALL: [PowerAction; 3] = [PowerAction::Sleep, PowerAction::Shutdown, PowerAction::Restart];

    /// Path segment and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::Sleep => "sleep",
            PowerAction::Shutdown => "shutdown",
            PowerAction::Restart => "restart",
        }
    }

    /// Message used in the device's success body.
    pub fn sent_message(&self) -> &'static str {
        match self {
            PowerAction::Sleep => "Sleep command sent",
            PowerAction::Shutdown => "Shutdown command sent",
            PowerAction::Restart => "Restart command sent",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a relayed command.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No response within the client timeout.
    #[error("Companion agent timed out")]
    Timeout,

    /// The agent could not be reached.
    #[error("Could not reach companion agent: {0}")]
    Connect(String),

    /// The agent answered with something other than 200.
    #[error("Companion agent returned HTTP {0}")]
    Status(u16),

    /// The HTTP client itself failed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// A fully formed relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub action: PowerAction,
    pub url: String,
    pub timeout: Duration,
}

impl RelayRequest {
    /// The token is form-encoded; it may contain any characters.
    pub fn new(action: PowerAction, host_ip: &str, host_port: u16, token: &str, timeout: Duration) -> Self {
        let token: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
        Self {
            action,
            url: format!("http://{}:{}/{}?token={}", host_ip, host_port, action, token),
            timeout,
        }
    }
}

/// Outbound path to the companion agent.
pub trait HostRelay: Send {
    /// Perform exactly one round trip. `Ok` only for HTTP 200.
    fn send(&mut self, request: &RelayRequest) -> Result<(), RelayError>;
}
