//! JSON bodies exchanged over HTTP.
//!
//! Device responses:
//!
//! ```json
//! {"status":"success","message":"Wake command sent","target":"AA:BB:CC:DD:EE:FF"}
//! {"error":"Unauthorized","code":401}
//! {"status":"online","ip":"...","mac":"...","target_mac":"...","broadcast_ip":"..."}
//! {"total_entries":5,"requested_count":3,"logs":[{"timestamp":12,"level":"INFO","message":"..."}]}
//! ```
//!
//! Companion agent responses:
//!
//! ```json
//! {"status":"success"}
//! {"status":"error","message":"Unauthorized"}
//! {"status":"running","hostname":"pc","os":"linux","os_version":"6.1","port":8888,"uptime":1700000000}
//! ```

use serde::{Deserialize, Serialize};

use crate::log_store::LogEntry;

/// Successful side-effecting command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSuccess {
    pub status: String,
    pub message: String,
    pub target: String,
}

impl CommandSuccess {
    pub fn new(message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            target: target.into(),
        }
    }
}

/// Generic device error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

/// `/status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: String,
    pub ip: String,
    pub mac: String,
    pub target_mac: String,
    pub broadcast_ip: String,
}

/// `/logs?json=true` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsBody {
    pub total_entries: usize,
    pub requested_count: usize,
    pub logs: Vec<LogEntry>,
}

/// Companion agent command reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AgentReply {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn error(message: Option<&str>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.map(str::to_string),
        }
    }
}

/// Companion agent `/status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub status: String,
    pub hostname: String,
    pub os: String,
    pub os_version: String,
    pub port: u16,
    /// Current Unix time in seconds.
    pub uptime: i64,
}
