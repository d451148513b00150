//! Request dispatch.
//!
//! [`Device`] owns every piece of mutable device state (the log ring and the
//! collaborators that touch the outside world) and turns a
//! [`CommandRequest`] into a [`Reply`]. Framework glue (Axum on Linux,
//! esp-idf-svc on ESP32) only converts between its own request/response
//! types and these.
//!
//! Side-effecting routes require the shared token. A missing token and a
//! wrong token are indistinguishable from outside: same status, same body,
//! same log entry, same blink.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::clock::{seconds_since_boot, Clock};
use crate::config::DeviceConfig;
use crate::log_store::{EventLog, LogLevel, LogStore};
use crate::magic_packet::{send_wake, WakeTransport};
use crate::messages::{CommandSuccess, ErrorBody, LogsBody, StatusBody};
use crate::relay::{HostRelay, PowerAction, RelayRequest};
use crate::request::{Action, CommandRequest};

/// Device state shared between the HTTP server and the control loop.
pub type SharedDevice = Arc<Mutex<Device>>;

/// Token check failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,
}

/// Compare a supplied token against the configured secret.
///
/// An empty secret never authorizes anything.
pub fn check_token(secret: &str, supplied: Option<&str>) -> Result<(), AuthError> {
    match supplied {
        None => Err(AuthError::MissingToken),
        Some(token) if secret.is_empty() || token != secret => Err(AuthError::InvalidToken),
        Some(_) => Ok(()),
    }
}

/// Visual feedback patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPattern {
    /// Command carried out.
    Accepted,
    /// Missing or wrong token.
    Rejected,
    /// Downstream action failed.
    Failed,
}

impl BlinkPattern {
    /// `(flashes, on_ms, off_ms)` for a single-LED indicator.
    pub fn timing(&self) -> (u32, u32, u32) {
        match self {
            BlinkPattern::Accepted => (2, 100, 100),
            BlinkPattern::Rejected => (5, 50, 50),
            BlinkPattern::Failed => (3, 300, 200),
        }
    }
}

/// Status LED or equivalent.
pub trait Indicator: Send {
    fn blink(&mut self, pattern: BlinkPattern);
}

/// [`Indicator`] that only traces.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceIndicator;

impl Indicator for TraceIndicator {
    fn blink(&mut self, pattern: BlinkPattern) {
        tracing::debug!(?pattern, "blink");
    }
}

/// The device's own network identity, reported by `/status`.
pub trait NetworkIdentity: Send {
    fn ip(&self) -> String;
    fn mac(&self) -> String;
}

/// Response content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Html,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Html => "text/html",
            ContentType::Text => "text/plain",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Framework-neutral HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: ContentType,
    pub body: String,
}

impl Reply {
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self {
                status,
                content_type: ContentType::Json,
                body,
            },
            Err(e) => Self::internal_error(&format!("Serialization failed: {}", e)),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &ErrorBody::new(message, status))
    }

    pub fn unauthorized() -> Self {
        Self::error(401, "Unauthorized")
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_type: ContentType::Text,
            body: "Not found".to_string(),
        }
    }

    fn internal_error(message: &str) -> Self {
        // Hand-built so it cannot fail again.
        Self {
            status: 500,
            content_type: ContentType::Json,
            body: format!(
                "{{\"error\":{},\"code\":500}}",
                serde_json::Value::String(message.to_string())
            ),
        }
    }
}

/// Page served by `/logs` without `json=true`; it polls the JSON form.
const LOGS_PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Device logs</title></head>
<body><pre id="logs">Loading...</pre>
<script>
async function refresh() {
  const res = await fetch('/logs?json=true&count=50');
  const data = await res.json();
  document.getElementById('logs').textContent = data.logs
    .map(e => `[${e.timestamp}s] ${e.level}: ${e.message}`).join('\n');
}
refresh();
setInterval(refresh, 2000);
</script></body></html>
"#;

/// External collaborators of the device.
pub struct Ports {
    pub clock: Box<dyn Clock>,
    pub wake: Box<dyn WakeTransport>,
    pub relay: Box<dyn HostRelay>,
    pub identity: Box<dyn NetworkIdentity>,
    pub indicator: Box<dyn Indicator>,
}

/// Device control-plane state.
pub struct Device {
    config: DeviceConfig,
    log: LogStore,
    ports: Ports,
}

impl Device {
    pub fn new(config: DeviceConfig, ports: Ports) -> Self {
        let log = LogStore::new(config.timing.log_capacity, config.timing.max_message_len);
        Self { config, log, ports }
    }

    /// Wrap in the mutex shared by the server and the control loop.
    pub fn into_shared(self) -> SharedDevice {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    /// Milliseconds since boot, wrapping.
    pub fn millis(&self) -> u32 {
        self.ports.clock.millis()
    }

    pub fn ip(&self) -> String {
        self.ports.identity.ip()
    }

    /// Route a request and carry out at most one side effect.
    pub fn dispatch(&mut self, request: &CommandRequest) -> Reply {
        let Some(action) = request.action else {
            tracing::debug!(path = %request.path, "no route");
            return Reply::not_found();
        };

        if action.requires_token() {
            if let Err(e) = check_token(&self.config.esp.token, request.token()) {
                tracing::debug!(action = action.name(), reason = %e, "rejected");
                self.record(
                    LogLevel::Warning,
                    &format!("Unauthorized {} request", action.name()),
                );
                self.ports.indicator.blink(BlinkPattern::Rejected);
                return Reply::unauthorized();
            }
        }

        match action {
            Action::Wake => self.wake(),
            Action::Power(power) => self.relay(power),
            Action::Status => self.status(),
            Action::Logs => self.logs(request),
        }
    }

    fn wake(&mut self) -> Reply {
        let target = &self.config.target;
        let result = send_wake(
            self.ports.wake.as_mut(),
            &target.mac,
            &target.broadcast_ip,
            target.wol_port,
        );

        match result {
            Ok(mac) => {
                let message = format!(
                    "Wake packet sent to {} via {}:{}",
                    mac, target.broadcast_ip, target.wol_port
                );
                self.record(LogLevel::Success, &message);
                self.ports.indicator.blink(BlinkPattern::Accepted);
                Reply::json(200, &CommandSuccess::new("Wake command sent", mac.to_string()))
            }
            Err(e) => {
                self.record(LogLevel::Error, &format!("Failed to send wake packet: {}", e));
                self.ports.indicator.blink(BlinkPattern::Failed);
                Reply::error(500, "Failed to send wake packet")
            }
        }
    }

    fn relay(&mut self, action: PowerAction) -> Reply {
        let host = self.config.host.clone();
        let failure = format!("Failed to send {} command", action);

        if host.ip.is_empty() {
            self.record(
                LogLevel::Error,
                &format!("{}: companion agent address not configured", failure),
            );
            self.ports.indicator.blink(BlinkPattern::Failed);
            return Reply::error(500, &failure);
        }

        let request = RelayRequest::new(
            action,
            &host.ip,
            host.port,
            &self.config.esp.token,
            self.config.timing.relay_timeout(),
        );
        self.record(
            LogLevel::Info,
            &format!("Relaying {} to {}:{}", action, host.ip, host.port),
        );

        match self.ports.relay.send(&request) {
            Ok(()) => {
                self.record(
                    LogLevel::Success,
                    &format!("{} delivered to {}", action.sent_message(), host.ip),
                );
                self.ports.indicator.blink(BlinkPattern::Accepted);
                Reply::json(200, &CommandSuccess::new(action.sent_message(), host.ip))
            }
            Err(e) => {
                self.record(LogLevel::Error, &format!("{}: {}", failure, e));
                self.ports.indicator.blink(BlinkPattern::Failed);
                Reply::error(500, &failure)
            }
        }
    }

    fn status(&self) -> Reply {
        Reply::json(
            200,
            &StatusBody {
                status: "online".to_string(),
                ip: self.ports.identity.ip(),
                mac: self.ports.identity.mac(),
                target_mac: self.config.target.mac.clone(),
                broadcast_ip: self.config.target.broadcast_ip.clone(),
            },
        )
    }

    fn logs(&self, request: &CommandRequest) -> Reply {
        if request.param("json") != Some("true") {
            return Reply {
                status: 200,
                content_type: ContentType::Html,
                body: LOGS_PAGE.to_string(),
            };
        }

        let count = self.requested_count(request.param("count"));
        match self.logs_json(count) {
            Ok(body) => Reply {
                status: 200,
                content_type: ContentType::Json,
                body,
            },
            Err(e) => {
                tracing::error!("Failed to serialize logs: {}", e);
                Reply::error(500, "Failed to read logs")
            }
        }
    }

    /// Clamp a `count` parameter to `[1, capacity]`; unparseable means default.
    fn requested_count(&self, raw: Option<&str>) -> usize {
        let capacity = self.log.capacity();
        let default = self.config.timing.default_log_count;
        let Some(raw) = raw.map(str::trim) else {
            return default.clamp(1, capacity);
        };
        let count = match raw.parse::<i64>() {
            Ok(count) => count,
            // Integers too wide for i64 still saturate at the bounds.
            Err(_) => match raw.strip_prefix('-') {
                Some(digits) if is_digits(digits) => 1,
                None if is_digits(raw.strip_prefix('+').unwrap_or(raw)) => capacity as i64,
                _ => default as i64,
            },
        };
        count.clamp(1, capacity as i64) as usize
    }

    /// The newest `count` entries as the `/logs?json=true` body.
    pub fn logs_json(&self, count: usize) -> Result<String, serde_json::Error> {
        let body = LogsBody {
            total_entries: self.log.total_entries(),
            requested_count: count,
            logs: self.log.recent(count).into_iter().cloned().collect(),
        };
        serde_json::to_string(&body)
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

impl EventLog for Device {
    fn record(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!(%level, "{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        let now = seconds_since_boot(self.ports.clock.millis());
        self.log.append(now, level, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic_packet::{MagicPacket, TransportError};
    use crate::relay::RelayError;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    type Sent<T> = Arc<Mutex<Vec<T>>>;

    struct FixedClock(u32);

    impl Clock for FixedClock {
        fn millis(&self) -> u32 {
            self.0
        }
    }

    struct FakeWake {
        sent: Sent<(Vec<u8>, Ipv4Addr, u16)>,
        fail: bool,
    }

    impl WakeTransport for FakeWake {
        fn send(
            &mut self,
            packet: &MagicPacket,
            broadcast_ip: Ipv4Addr,
            port: u16,
        ) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "network unreachable",
                )));
            }
            self.sent
                .lock()
                .unwrap()
                .push((packet.as_bytes().to_vec(), broadcast_ip, port));
            Ok(())
        }
    }

    struct FakeRelay {
        sent: Sent<RelayRequest>,
        fail: bool,
    }

    impl HostRelay for FakeRelay {
        fn send(&mut self, request: &RelayRequest) -> Result<(), RelayError> {
            self.sent.lock().unwrap().push(request.clone());
            if self.fail {
                Err(RelayError::Timeout)
            } else {
                Ok(())
            }
        }
    }

    struct FakeIdentity;

    impl NetworkIdentity for FakeIdentity {
        fn ip(&self) -> String {
            "192.168.1.42".to_string()
        }

        fn mac(&self) -> String {
            "24:6F:28:00:00:01".to_string()
        }
    }

    struct FakeIndicator(Sent<BlinkPattern>);

    impl Indicator for FakeIndicator {
        fn blink(&mut self, pattern: BlinkPattern) {
            self.0.lock().unwrap().push(pattern);
        }
    }

    struct Harness {
        device: Device,
        packets: Sent<(Vec<u8>, Ipv4Addr, u16)>,
        relayed: Sent<RelayRequest>,
        blinks: Sent<BlinkPattern>,
    }

    fn config() -> DeviceConfig {
        DeviceConfig::from_json(
            r#"{
                "target": { "mac": "AA:BB:CC:DD:EE:FF", "broadcast_ip": "192.168.1.255", "wol_port": 9 },
                "esp": { "token": "abc123" },
                "host": { "ip": "192.168.1.20", "port": 8888 }
            }"#,
        )
        .unwrap()
    }

    fn harness_with(config: DeviceConfig, wake_fails: bool, relay_fails: bool) -> Harness {
        let packets = Sent::default();
        let relayed = Sent::default();
        let blinks = Sent::default();
        let ports = Ports {
            clock: Box::new(FixedClock(12_345)),
            wake: Box::new(FakeWake {
                sent: packets.clone(),
                fail: wake_fails,
            }),
            relay: Box::new(FakeRelay {
                sent: relayed.clone(),
                fail: relay_fails,
            }),
            identity: Box::new(FakeIdentity),
            indicator: Box::new(FakeIndicator(blinks.clone())),
        };
        Harness {
            device: Device::new(config, ports),
            packets,
            relayed,
            blinks,
        }
    }

    fn harness() -> Harness {
        harness_with(config(), false, false)
    }

    fn body(reply: &Reply) -> serde_json::Value {
        serde_json::from_str(&reply.body).unwrap()
    }

    fn get(device: &mut Device, uri: &str) -> Reply {
        device.dispatch(&CommandRequest::from_uri(uri))
    }

    #[test]
    fn test_check_token() {
        assert_eq!(check_token("abc", None), Err(AuthError::MissingToken));
        assert_eq!(check_token("abc", Some("abd")), Err(AuthError::InvalidToken));
        assert_eq!(check_token("abc", Some("")), Err(AuthError::InvalidToken));
        assert_eq!(check_token("", Some("")), Err(AuthError::InvalidToken));
        assert_eq!(check_token("abc", Some("abc")), Ok(()));
    }

    #[test]
    fn test_wake_sends_packet() {
        let mut h = harness();
        let reply = get(&mut h.device, "/wake?token=abc123");

        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, ContentType::Json);
        assert_eq!(
            reply.body,
            r#"{"status":"success","message":"Wake command sent","target":"AA:BB:CC:DD:EE:FF"}"#
        );

        let packets = h.packets.lock().unwrap();
        assert_eq!(packets.len(), 1);
        let (bytes, ip, port) = &packets[0];
        assert_eq!(&bytes[..6], &[0xFF; 6]);
        assert!(bytes[6..]
            .chunks(6)
            .all(|c| c == [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]));
        assert_eq!(*ip, Ipv4Addr::new(192, 168, 1, 255));
        assert_eq!(*port, 9);
        assert_eq!(*h.blinks.lock().unwrap(), vec![BlinkPattern::Accepted]);
    }

    #[test]
    fn test_missing_and_wrong_token_look_identical() {
        let mut missing = harness();
        let mut wrong = harness();

        let a = get(&mut missing.device, "/wake");
        let b = get(&mut wrong.device, "/wake?token=nope");

        assert_eq!(a, b);
        assert_eq!(a.status, 401);
        assert_eq!(body(&a), serde_json::json!({"error": "Unauthorized", "code": 401}));
        assert_eq!(
            missing.device.logs_json(10).unwrap(),
            wrong.device.logs_json(10).unwrap()
        );
        assert_eq!(*missing.blinks.lock().unwrap(), vec![BlinkPattern::Rejected]);
        assert_eq!(*wrong.blinks.lock().unwrap(), vec![BlinkPattern::Rejected]);
    }

    #[test]
    fn test_unauthorized_has_no_side_effect() {
        let mut h = harness();
        for uri in [
            "/wake?token=",
            "/sleep",
            "/shutdown?token=ABC123",
            "/restart?token=abc1234",
            "/wake?tok=abc123",
        ] {
            assert_eq!(get(&mut h.device, uri).status, 401, "{}", uri);
        }
        assert!(h.packets.lock().unwrap().is_empty());
        assert!(h.relayed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_wake_bad_mac_is_500() {
        let mut cfg = config();
        cfg.target.mac = "AA-BB-CC-DD-EE-FF".to_string();
        let mut h = harness_with(cfg, false, false);

        let reply = get(&mut h.device, "/wake?token=abc123");

        assert_eq!(reply.status, 500);
        assert_eq!(body(&reply)["error"], "Failed to send wake packet");
        assert!(h.packets.lock().unwrap().is_empty());
        assert_eq!(h.device.log().recent(1)[0].level, LogLevel::Error);
    }

    #[test]
    fn test_wake_transport_failure_is_500() {
        let mut h = harness_with(config(), true, false);
        let reply = get(&mut h.device, "/wake?token=abc123");

        assert_eq!(reply.status, 500);
        assert_eq!(*h.blinks.lock().unwrap(), vec![BlinkPattern::Failed]);
    }

    #[test]
    fn test_power_commands_relayed() {
        for action in PowerAction::ALL {
            let mut h = harness();
            let reply = get(&mut h.device, &format!("/{}?token=abc123", action));

            assert_eq!(reply.status, 200);
            assert_eq!(
                body(&reply),
                serde_json::json!({
                    "status": "success",
                    "message": action.sent_message(),
                    "target": "192.168.1.20"
                })
            );

            let relayed = h.relayed.lock().unwrap();
            assert_eq!(relayed.len(), 1);
            assert_eq!(
                relayed[0].url,
                format!("http://192.168.1.20:8888/{}?token=abc123", action)
            );
            assert_eq!(relayed[0].timeout, std::time::Duration::from_secs(5));
        }
    }

    #[test]
    fn test_relay_failure_is_500() {
        let mut h = harness_with(config(), false, true);
        let reply = get(&mut h.device, "/shutdown?token=abc123");

        assert_eq!(reply.status, 500);
        assert_eq!(
            reply.body,
            r#"{"error":"Failed to send shutdown command","code":500}"#
        );
        assert_eq!(h.relayed.lock().unwrap().len(), 1);
        let newest = h.device.log().recent(1)[0].clone();
        assert_eq!(newest.level, LogLevel::Error);
        assert!(newest.message.starts_with("Failed to send shutdown command"));
    }

    #[test]
    fn test_relay_without_host_is_500_without_attempt() {
        let mut cfg = config();
        cfg.host.ip = String::new();
        let mut h = harness_with(cfg, false, false);

        assert_eq!(get(&mut h.device, "/sleep?token=abc123").status, 500);
        assert!(h.relayed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_status() {
        let mut h = harness();
        let reply = get(&mut h.device, "/status");

        assert_eq!(reply.status, 200);
        assert_eq!(
            body(&reply),
            serde_json::json!({
                "status": "online",
                "ip": "192.168.1.42",
                "mac": "24:6F:28:00:00:01",
                "target_mac": "AA:BB:CC:DD:EE:FF",
                "broadcast_ip": "192.168.1.255"
            })
        );
    }

    #[test]
    fn test_status_and_logs_do_not_mutate() {
        let mut h = harness();
        h.device.record(LogLevel::Info, "boot");
        let before = h.device.logs_json(50).unwrap();

        for _ in 0..3 {
            get(&mut h.device, "/status");
            get(&mut h.device, "/logs?json=true");
            get(&mut h.device, "/logs");
        }

        assert_eq!(h.device.logs_json(50).unwrap(), before);
        assert!(h.blinks.lock().unwrap().is_empty());
        assert!(h.packets.lock().unwrap().is_empty());
    }

    #[test]
    fn test_logs_json_newest_first() {
        let mut h = harness();
        for i in 0..5 {
            h.device.record(LogLevel::Info, &format!("event {}", i));
        }

        let reply = get(&mut h.device, "/logs?json=true&count=3");
        let json = body(&reply);

        assert_eq!(reply.status, 200);
        assert_eq!(json["total_entries"], 5);
        assert_eq!(json["requested_count"], 3);
        let logs = json["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0]["message"], "event 4");
        assert_eq!(logs[2]["message"], "event 2");
        assert_eq!(logs[0]["level"], "INFO");
        assert_eq!(logs[0]["timestamp"], 12);
    }

    #[test]
    fn test_logs_count_clamped() {
        let mut h = harness();
        let requested = |device: &mut Device, uri: &str| body(&get(device, uri))["requested_count"].clone();

        assert_eq!(requested(&mut h.device, "/logs?json=true"), 10);
        assert_eq!(requested(&mut h.device, "/logs?json=true&count=0"), 1);
        assert_eq!(requested(&mut h.device, "/logs?json=true&count=-4"), 1);
        assert_eq!(requested(&mut h.device, "/logs?json=true&count=500"), 50);
        assert_eq!(requested(&mut h.device, "/logs?json=true&count=abc"), 10);
        assert_eq!(
            requested(&mut h.device, "/logs?json=true&count=99999999999999999999"),
            50
        );
        assert_eq!(
            requested(&mut h.device, "/logs?json=true&count=-99999999999999999999"),
            1
        );
    }

    #[test]
    fn test_logs_page_without_json_flag() {
        let mut h = harness();
        let reply = get(&mut h.device, "/logs?json=false");

        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, ContentType::Html);
        assert!(reply.body.contains("/logs?json=true"));
    }

    #[test]
    fn test_unknown_route_is_plain_404() {
        let mut h = harness();
        let reply = get(&mut h.device, "/reboot?token=abc123");

        assert_eq!(reply.status, 404);
        assert_eq!(reply.content_type, ContentType::Text);
        assert!(h.device.log().is_empty());
    }
}
