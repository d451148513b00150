//! WiFi station radio for ESP32.
//!
//! The driver is shared between the control loop, which owns association,
//! and the dispatcher, which reports the station address in `/status`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{modem::Modem, peripheral},
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};
use log::info;
use wol_core::connectivity::{Radio, RadioError};
use wol_core::dispatcher::NetworkIdentity;
use wol_core::MacAddress;

/// WiFi driver shared by the radio and the identity.
pub type SharedWifi = Arc<Mutex<EspWifi<'static>>>;

/// Create the (not yet started) WiFi driver.
pub fn shared_wifi(
    modem: impl peripheral::Peripheral<P = Modem> + 'static,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
) -> Result<SharedWifi> {
    let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
    Ok(Arc::new(Mutex::new(wifi)))
}

fn lock(wifi: &SharedWifi) -> MutexGuard<'_, EspWifi<'static>> {
    wifi.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`Radio`] over the ESP32 station interface.
pub struct EspRadio {
    wifi: SharedWifi,
}

impl EspRadio {
    pub fn new(wifi: SharedWifi) -> Self {
        Self { wifi }
    }
}

impl Radio for EspRadio {
    fn is_associated(&mut self) -> bool {
        lock(&self.wifi).is_up().unwrap_or(false)
    }

    fn begin_association(&mut self, ssid: &str, password: &str) -> Result<(), RadioError> {
        let auth_method = if password.is_empty() {
            info!("WiFi password is empty, using open network");
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let configuration = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| RadioError("SSID too long (max 32 chars)".into()))?,
            password: password
                .try_into()
                .map_err(|_| RadioError("Password too long (max 64 chars)".into()))?,
            auth_method,
            ..Default::default()
        });

        let mut wifi = lock(&self.wifi);
        let esp = |e: esp_idf_svc::sys::EspError| RadioError(e.to_string());

        if !wifi.is_started().map_err(esp)? {
            wifi.set_configuration(&configuration).map_err(esp)?;
            wifi.start().map_err(esp)?;
        } else {
            // Drop a half-open association before retrying.
            let _ = wifi.disconnect();
        }

        info!("Connecting to '{}'...", ssid);
        // Returns immediately; the loop polls `is_associated`.
        wifi.connect().map_err(esp)
    }
}

/// [`NetworkIdentity`] of the station interface.
pub struct EspIdentity {
    wifi: SharedWifi,
}

impl EspIdentity {
    pub fn new(wifi: SharedWifi) -> Self {
        Self { wifi }
    }
}

impl NetworkIdentity for EspIdentity {
    fn ip(&self) -> String {
        lock(&self.wifi)
            .sta_netif()
            .get_ip_info()
            .map(|info| info.ip.to_string())
            .unwrap_or_else(|_| "0.0.0.0".to_string())
    }

    fn mac(&self) -> String {
        lock(&self.wifi)
            .sta_netif()
            .get_mac()
            .map(|mac| MacAddress(mac).to_string())
            .unwrap_or_else(|_| "00:00:00:00:00:00".to_string())
    }
}
