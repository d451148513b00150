//! Wake-on-LAN magic packets.
//!
//! A magic packet is 6 bytes of `0xFF` followed by the target's hardware
//! address repeated 16 times (102 bytes). It is broadcast over UDP; there is
//! no acknowledgment, so a successful send only means the OS accepted the
//! datagram.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use thiserror::Error;

/// Length of a magic packet in bytes.
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Length of the accepted `XX:XX:XX:XX:XX:XX` form.
const MAC_TEXT_LEN: usize = 17;

/// Errors from MAC address parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacParseError {
    #[error("MAC address must be 17 characters, got {0}")]
    Length(usize),

    #[error("MAC address must be colon separated")]
    Separator,

    #[error("Invalid hex byte in MAC address: {0}")]
    Hex(String),
}

/// Errors from sending a magic packet.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target or broadcast address could not be parsed.
    #[error("Invalid address: {0}")]
    Parse(String),

    /// The socket could not be opened or the datagram was refused.
    #[error("UDP send failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MacParseError> for TransportError {
    fn from(err: MacParseError) -> Self {
        TransportError::Parse(err.to_string())
    }
}

/// A 6-byte hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl std::str::FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mac(s)
    }
}

/// Parse the colon-hex form `XX:XX:XX:XX:XX:XX`.
///
/// Any other length, separator, or non-hex digit is rejected.
pub fn parse_mac(text: &str) -> Result<MacAddress, MacParseError> {
    if text.len() != MAC_TEXT_LEN {
        return Err(MacParseError::Length(text.len()));
    }

    let mut bytes = [0u8; 6];
    let mut parts = text.split(':');
    for byte in bytes.iter_mut() {
        let part = parts.next().ok_or(MacParseError::Separator)?;
        if part.len() != 2 {
            return Err(MacParseError::Separator);
        }
        if !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MacParseError::Hex(part.to_string()));
        }
        *byte = u8::from_str_radix(part, 16).map_err(|_| MacParseError::Hex(part.to_string()))?;
    }
    if parts.next().is_some() {
        return Err(MacParseError::Separator);
    }

    Ok(MacAddress(bytes))
}

/// The 102-byte Wake-on-LAN payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Build the magic packet for `mac`.
pub fn build_magic_packet(mac: &MacAddress) -> MagicPacket {
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac.0);
    }
    MagicPacket(packet)
}

/// Outbound path for magic packets.
pub trait WakeTransport: Send {
    /// Broadcast `packet` to `broadcast_ip:port`.
    fn send(&mut self, packet: &MagicPacket, broadcast_ip: Ipv4Addr, port: u16)
        -> Result<(), TransportError>;
}

/// [`WakeTransport`] over a UDP socket opened for each send.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpWakeTransport;

impl WakeTransport for UdpWakeTransport {
    fn send(
        &mut self,
        packet: &MagicPacket,
        broadcast_ip: Ipv4Addr,
        port: u16,
    ) -> Result<(), TransportError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;
        let sent = socket.send_to(packet.as_bytes(), SocketAddrV4::new(broadcast_ip, port))?;
        if sent != MAGIC_PACKET_LEN {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, MAGIC_PACKET_LEN),
            )));
        }
        Ok(())
    }
}

/// Parse both addresses and broadcast a magic packet for `mac`.
pub fn send_wake(
    transport: &mut dyn WakeTransport,
    mac: &str,
    broadcast_ip: &str,
    port: u16,
) -> Result<MacAddress, TransportError> {
    let mac = parse_mac(mac)?;
    let broadcast_ip: Ipv4Addr = broadcast_ip
        .parse()
        .map_err(|_| TransportError::Parse(format!("broadcast address {}", broadcast_ip)))?;
    transport.send(&build_magic_packet(&mac), broadcast_ip, port)?;
    Ok(mac)
}
