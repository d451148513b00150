//! Wake-on-LAN relay firmware for ESP32.
//!
//! This binary requires the ESP32 Rust toolchain.
//! It will not compile with the standard Rust toolchain.
//!
//! Boot: connect WiFi (or restart), start the HTTP server, then run the
//! control loop forever. Persistent loss of connectivity restarts the chip.

use std::fmt::Display;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::reset;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use wol_core::{BootClock, ControlLoop, Device, Ports, UdpWakeTransport};
use wol_esp32::config::build_time_config;
use wol_esp32::http::start_server;
use wol_esp32::led::Led;
use wol_esp32::relay::EspHttpRelay;
use wol_esp32::wifi::{shared_wifi, EspIdentity, EspRadio};

const LOOP_PAUSE_MS: u32 = 10;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("Wake-on-LAN relay starting");

    let config = build_time_config()?;
    let http_port = config.esp.http_port;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let wifi = shared_wifi(peripherals.modem, sysloop, nvs)?;
    let led = Led::new(peripherals.pins.gpio2)?;

    let device = Device::new(
        config,
        Ports {
            clock: Box::new(BootClock::new()),
            wake: Box::new(UdpWakeTransport),
            relay: Box::new(EspHttpRelay),
            identity: Box::new(EspIdentity::new(wifi.clone())),
            indicator: Box::new(led),
        },
    )
    .into_shared();

    let mut control = ControlLoop::new(device.clone(), EspRadio::new(wifi), Box::new(BootClock::new()));
    if let Err(e) = control.startup(&mut |ms| FreeRtos::delay_ms(ms)) {
        restart(e);
    }

    // Keep the handle alive; dropping it stops the server.
    let _server = start_server(device, http_port)?;

    loop {
        if let Err(e) = control.tick() {
            restart(e);
        }
        FreeRtos::delay_ms(LOOP_PAUSE_MS);
    }
}

fn restart(reason: impl Display) -> ! {
    log::error!("Restarting: {}", reason);
    FreeRtos::delay_ms(1000);
    reset::restart()
}
