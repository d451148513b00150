//! Wi-Fi association state machine.
//!
//! The device is useless while offline, so persistent failure is fatal: the
//! caller restarts the whole device when [`ConnectivityFailure`] is
//! returned. Transient drops are repaired with a bounded number of
//! reassociation attempts, spaced by the check interval.

use thiserror::Error;

use crate::clock::{elapsed_ms, Clock};
use crate::config::{Timing, WifiSettings};
use crate::log_store::{EventLog, LogLevel};

/// Association state as seen by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Errors reported by a radio driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("radio error: {0}")]
pub struct RadioError(pub String);

/// Fatal connectivity outcomes. The device must restart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityFailure {
    #[error("WiFi reconnect failed after {0} attempts")]
    RetriesExhausted(u32),

    #[error("WiFi not associated within {0} ms of boot")]
    InitialTimeout(u32),

    #[error("WiFi association could not be started: {0}")]
    Association(String),
}

/// Station-mode radio.
pub trait Radio: Send {
    /// Associated and holding an address.
    fn is_associated(&mut self) -> bool;

    /// Start associating with stored credentials. Does not wait.
    fn begin_association(&mut self, ssid: &str, password: &str) -> Result<(), RadioError>;
}

/// Result of one [`ConnectivityManager::ensure_connected`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Checked too recently; nothing done.
    Skipped,
    /// Still associated.
    Up,
    /// Association lost; attempt `n` issued.
    Reconnecting(u32),
    /// Association came back; retry counter reset.
    Recovered,
}

/// Owns [`ConnectionState`] and the retry counter.
#[derive(Debug, Clone)]
pub struct ConnectivityManager {
    state: ConnectionState,
    retries: u32,
    last_check: Option<u32>,
    ssid: String,
    password: String,
    check_interval_ms: u32,
    max_retries: u32,
    initial_timeout_ms: u32,
}

impl ConnectivityManager {
    pub fn new(wifi: &WifiSettings, timing: &Timing) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retries: 0,
            last_check: None,
            ssid: wifi.ssid.clone(),
            password: wifi.password.clone(),
            check_interval_ms: timing.check_interval_ms,
            max_retries: timing.max_retries,
            initial_timeout_ms: timing.initial_connect_timeout_ms,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Blocking association at boot, bounded by the initial timeout.
    ///
    /// `pause` is called between polls with a delay in milliseconds.
    pub fn connect_initial(
        &mut self,
        radio: &mut dyn Radio,
        clock: &dyn Clock,
        pause: &mut dyn FnMut(u32),
        log: &mut dyn EventLog,
    ) -> Result<(), ConnectivityFailure> {
        const POLL_MS: u32 = 250;

        log.record(
            LogLevel::Info,
            &format!("Connecting to WiFi '{}'", self.ssid),
        );
        self.state = ConnectionState::Connecting;
        if let Err(e) = radio.begin_association(&self.ssid, &self.password) {
            self.state = ConnectionState::Disconnected;
            log.record(LogLevel::Error, &format!("WiFi association failed: {}", e));
            return Err(ConnectivityFailure::Association(e.0));
        }

        let start = clock.millis();
        loop {
            let now = clock.millis();
            if radio.is_associated() {
                self.state = ConnectionState::Connected;
                self.retries = 0;
                self.last_check = Some(now);
                log.record(LogLevel::Success, "WiFi connected");
                return Ok(());
            }
            if elapsed_ms(now, start) >= self.initial_timeout_ms {
                break;
            }
            pause(POLL_MS);
        }

        self.state = ConnectionState::Disconnected;
        log.record(
            LogLevel::Error,
            &format!(
                "WiFi connection timed out after {} s, restarting",
                self.initial_timeout_ms / 1000
            ),
        );
        Err(ConnectivityFailure::InitialTimeout(self.initial_timeout_ms))
    }

    /// Check the link and repair it if needed. Call once per loop iteration.
    pub fn ensure_connected(
        &mut self,
        radio: &mut dyn Radio,
        now: u32,
        log: &mut dyn EventLog,
    ) -> Result<LinkStatus, ConnectivityFailure> {
        if let Some(last) = self.last_check {
            if elapsed_ms(now, last) < self.check_interval_ms {
                return Ok(LinkStatus::Skipped);
            }
        }
        self.last_check = Some(now);

        if radio.is_associated() {
            if self.state == ConnectionState::Connected {
                return Ok(LinkStatus::Up);
            }
            self.state = ConnectionState::Connected;
            self.retries = 0;
            log.record(LogLevel::Success, "WiFi reconnected");
            return Ok(LinkStatus::Recovered);
        }

        self.retries += 1;
        if self.retries > self.max_retries {
            self.state = ConnectionState::Disconnected;
            log.record(
                LogLevel::Error,
                &format!(
                    "WiFi reconnect failed after {} attempts, restarting",
                    self.max_retries
                ),
            );
            return Err(ConnectivityFailure::RetriesExhausted(self.max_retries));
        }

        self.state = ConnectionState::Connecting;
        log.record(
            LogLevel::Warning,
            &format!(
                "WiFi disconnected, reconnect attempt {}/{}",
                self.retries, self.max_retries
            ),
        );
        if let Err(e) = radio.begin_association(&self.ssid, &self.password) {
            log.record(LogLevel::Warning, &format!("Reconnect request failed: {}", e));
        }
        Ok(LinkStatus::Reconnecting(self.retries))
    }
}
