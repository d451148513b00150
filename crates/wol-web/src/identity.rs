//! Host network identity.
//!
//! On Linux the device runs over whatever link the host already has, so the
//! "radio" is a probe: the link counts as associated while the kernel can
//! pick a local IPv4 source address towards the probe address. Nothing is
//! sent by the probe.

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4, UdpSocket};

use wol_core::connectivity::{Radio, RadioError};
use wol_core::dispatcher::NetworkIdentity;

const UNKNOWN_MAC: &str = "00:00:00:00:00:00";

/// Local IPv4 address the kernel would use to reach `probe`.
pub fn local_ipv4(probe: Ipv4Addr) -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.set_broadcast(true).ok()?;
    socket.connect(SocketAddrV4::new(probe, 9)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// Hardware address of `interface` from sysfs, upper-cased.
pub fn interface_mac(interface: &str) -> Option<String> {
    let raw = std::fs::read_to_string(format!("/sys/class/net/{}/address", interface)).ok()?;
    let mac = raw.trim().to_ascii_uppercase();
    (!mac.is_empty()).then_some(mac)
}

/// [`NetworkIdentity`] of the Linux host.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    probe: Ipv4Addr,
    interface: Option<String>,
}

impl HostIdentity {
    pub fn new(probe: Ipv4Addr, interface: Option<String>) -> Self {
        Self { probe, interface }
    }
}

impl NetworkIdentity for HostIdentity {
    fn ip(&self) -> String {
        local_ipv4(self.probe)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| Ipv4Addr::UNSPECIFIED.to_string())
    }

    fn mac(&self) -> String {
        self.interface
            .as_deref()
            .and_then(interface_mac)
            .unwrap_or_else(|| UNKNOWN_MAC.to_string())
    }
}

/// [`Radio`] backed by the host's routing table.
#[derive(Debug, Clone, Copy)]
pub struct HostLink {
    probe: Ipv4Addr,
}

impl HostLink {
    pub fn new(probe: Ipv4Addr) -> Self {
        Self { probe }
    }
}

impl Radio for HostLink {
    fn is_associated(&mut self) -> bool {
        local_ipv4(self.probe).is_some()
    }

    fn begin_association(&mut self, ssid: &str, _password: &str) -> Result<(), RadioError> {
        // The host's network manager owns the link; there is nothing to start.
        tracing::debug!(ssid, "association requested from host link");
        Ok(())
    }
}
