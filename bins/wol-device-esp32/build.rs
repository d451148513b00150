//! Build script for the Wake-on-LAN ESP32 firmware.

fn main() {
    // Required for esp-idf-svc to find the IDF toolchain
    embuild::espidf::sysenv::output();

    // Configuration is baked in by wol-esp32; rebuild when it changes.
    for var in [
        "WOL_WIFI_SSID",
        "WOL_WIFI_PASSWORD",
        "WOL_TARGET_MAC",
        "WOL_BROADCAST_IP",
        "WOL_TOKEN",
        "WOL_HOST_IP",
        "WOL_HOST_PORT",
    ] {
        println!("cargo:rerun-if-env-changed={}", var);
    }
}
