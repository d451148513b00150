//! Power-state commands on the machine running the companion agent.

use std::process::Command;
use thiserror::Error;
use wol_core::PowerAction;

/// Errors from executing a power command.
#[derive(Debug, Error)]
pub enum PowerError {
    #[error("{action} is not supported on {os}")]
    Unsupported { action: PowerAction, os: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Executes power actions.
pub trait PowerControl: Send + Sync {
    /// Start the action. Returns once the command is launched, not completed.
    fn execute(&self, action: PowerAction) -> Result<(), PowerError>;
}

const WINDOWS_SUSPEND: &str = "(Add-Type -AssemblyName System.Windows.Forms); \
    [System.Windows.Forms.Application]::SetSuspendState('Suspend',$false,$false)";

/// Program and arguments for `action` on `os` (`std::env::consts::OS` naming).
pub fn power_command(os: &str, action: PowerAction) -> Option<(&'static str, Vec<&'static str>)> {
    let command = match (os, action) {
        ("windows", PowerAction::Shutdown) => ("shutdown", vec!["/s", "/t", "0"]),
        ("windows", PowerAction::Restart) => ("shutdown", vec!["/r", "/t", "0"]),
        ("windows", PowerAction::Sleep) => ("powershell", vec!["-NoProfile", "-Command", WINDOWS_SUSPEND]),
        ("linux", PowerAction::Shutdown) => ("systemctl", vec!["poweroff"]),
        ("linux", PowerAction::Restart) => ("systemctl", vec!["reboot"]),
        ("linux", PowerAction::Sleep) => ("systemctl", vec!["suspend"]),
        ("macos", PowerAction::Shutdown) => ("sudo", vec!["shutdown", "-h", "now"]),
        ("macos", PowerAction::Restart) => ("sudo", vec!["shutdown", "-r", "now"]),
        ("macos", PowerAction::Sleep) => ("pmset", vec!["sleepnow"]),
        _ => return None,
    };
    Some(command)
}

/// [`PowerControl`] spawning the host OS's own commands.
#[derive(Debug, Clone)]
pub struct SystemPower {
    os: String,
}

impl SystemPower {
    pub fn new() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
        }
    }
}

impl Default for SystemPower {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerControl for SystemPower {
    fn execute(&self, action: PowerAction) -> Result<(), PowerError> {
        let (program, args) = power_command(&self.os, action).ok_or_else(|| PowerError::Unsupported {
            action,
            os: self.os.clone(),
        })?;

        tracing::info!(%action, program, ?args, "executing power command");
        spawn_detached(program, &args).map(|_| ())
    }
}

/// Start `program` without waiting for it. A background thread reaps the
/// child so it does not linger as a zombie.
pub fn spawn_detached(program: &str, args: &[&str]) -> Result<std::thread::JoinHandle<()>, PowerError> {
    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|source| PowerError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let program = program.to_string();
    Ok(std::thread::spawn(move || match child.wait() {
        Ok(status) if status.success() => tracing::debug!(program = %program, "power command finished"),
        Ok(status) => tracing::warn!(program = %program, %status, "power command failed"),
        Err(e) => tracing::warn!(program = %program, "waiting for power command failed: {}", e),
    }))
}
