//! The device control loop.
//!
//! One loop owns connectivity and housekeeping; inbound requests are
//! serviced by the platform HTTP server against the same [`SharedDevice`].
//! The mutex serializes requests with each other and with the loop, so a
//! slow relay call holds everything else back just as a single-threaded
//! loop would.

use std::sync::{MutexGuard, PoisonError};

use crate::clock::{elapsed_ms, seconds_since_boot, Clock};
use crate::connectivity::{ConnectionState, ConnectivityFailure, ConnectivityManager, LinkStatus, Radio};
use crate::dispatcher::{Device, SharedDevice};
use crate::log_store::{EventLog, LogLevel};

/// Lock the device, recovering the state if a previous holder panicked.
pub fn lock_device(device: &SharedDevice) -> MutexGuard<'_, Device> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventLog for SharedDevice {
    fn record(&mut self, level: LogLevel, message: &str) {
        lock_device(self).record(level, message);
    }
}

/// Connectivity plus periodic heartbeat.
pub struct ControlLoop<R: Radio> {
    device: SharedDevice,
    link: ConnectivityManager,
    radio: R,
    clock: Box<dyn Clock>,
    heartbeat_interval_ms: u32,
    last_heartbeat: u32,
}

impl<R: Radio> ControlLoop<R> {
    pub fn new(device: SharedDevice, radio: R, clock: Box<dyn Clock>) -> Self {
        let (link, heartbeat_interval_ms) = {
            let device = lock_device(&device);
            let config = device.config();
            (
                ConnectivityManager::new(&config.wifi, &config.timing),
                config.timing.heartbeat_interval_ms,
            )
        };
        let last_heartbeat = clock.millis();
        Self {
            device,
            link,
            radio,
            clock,
            heartbeat_interval_ms,
            last_heartbeat,
        }
    }

    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Boot sequence: blocking association, then a ready entry.
    pub fn startup(&mut self, pause: &mut dyn FnMut(u32)) -> Result<(), ConnectivityFailure> {
        self.link
            .connect_initial(&mut self.radio, self.clock.as_ref(), pause, &mut self.device)?;

        let mut device = lock_device(&self.device);
        let ip = device.ip();
        let target = device.config().target.mac.clone();
        device.record(LogLevel::Info, &format!("Device ready at {}", ip));
        if !device.config().target_mac_is_valid() {
            device.record(
                LogLevel::Warning,
                &format!("Target MAC '{}' is malformed; wake requests will fail", target),
            );
        }
        self.last_heartbeat = self.clock.millis();
        Ok(())
    }

    /// One loop iteration. An error means the device must restart.
    pub fn tick(&mut self) -> Result<LinkStatus, ConnectivityFailure> {
        let now = self.clock.millis();
        let status = self
            .link
            .ensure_connected(&mut self.radio, now, &mut self.device)?;

        if elapsed_ms(now, self.last_heartbeat) >= self.heartbeat_interval_ms {
            self.last_heartbeat = now;
            let message = format!(
                "Heartbeat: uptime {}, WiFi {:?}",
                format_uptime(seconds_since_boot(now)),
                self.link.state()
            );
            self.device.record(LogLevel::Info, &message);
        }
        Ok(status)
    }
}

/// `Dd HH:MM:SS` for a seconds count.
pub fn format_uptime(seconds: u32) -> String {
    format!(
        "{}d {:02}:{:02}:{:02}",
        seconds / 86_400,
        (seconds / 3_600) % 24,
        (seconds / 60) % 60,
        seconds % 60
    )
}
