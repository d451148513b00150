//! Companion agent router tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use wol_core::messages::{AgentReply, AgentStatus};
use wol_core::{AgentConfig, PowerAction};
use wol_web::{create_agent_router, AgentState, PowerControl, PowerError};

#[derive(Default)]
struct RecordingPower {
    executed: Mutex<Vec<PowerAction>>,
    fail: bool,
}

impl PowerControl for RecordingPower {
    fn execute(&self, action: PowerAction) -> Result<(), PowerError> {
        if self.fail {
            return Err(PowerError::Unsupported {
                action,
                os: "test".to_string(),
            });
        }
        self.executed.lock().unwrap().push(action);
        Ok(())
    }
}

fn state(allowed_ips: &str, power: Arc<RecordingPower>) -> AgentState {
    let json = format!(
        r#"{{ "esp": {{ "token": "abc123" }}, "host": {{ "port": 8888, "allowed_ips": {} }} }}"#,
        allowed_ips
    );
    let config = AgentConfig::from_json(&json).unwrap();
    AgentState::new(&config, power)
}

async fn get(state: AgentState, peer: &str, uri: &str) -> (StatusCode, String) {
    let peer: SocketAddr = peer.parse().unwrap();
    let app = create_agent_router(state).layer(MockConnectInfo(peer));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_authorized_command_runs() {
    let power = Arc::new(RecordingPower::default());

    let (status, body) = get(state("[]", power.clone()), "10.0.0.9:5000", "/sleep?token=abc123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success"}"#);
    assert_eq!(*power.executed.lock().unwrap(), vec![PowerAction::Sleep]);
}

#[tokio::test]
async fn test_forbidden_peer_checked_before_token() {
    let power = Arc::new(RecordingPower::default());
    let state = state(r#"["192.168.1.50"]"#, power.clone());

    let (status, body) = get(state.clone(), "192.168.1.51:5000", "/shutdown?token=wrong").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let body: AgentReply = serde_json::from_str(&body).unwrap();
    assert_eq!(body, AgentReply::error(Some("Forbidden: IP not allowed")));

    let (status, _) = get(state, "192.168.1.50:5000", "/shutdown?token=abc123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*power.executed.lock().unwrap(), vec![PowerAction::Shutdown]);
}

#[tokio::test]
async fn test_bad_token_is_401() {
    let power = Arc::new(RecordingPower::default());
    let state = state("[]", power.clone());

    let (status, body) = get(state.clone(), "10.0.0.9:5000", "/restart?token=wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"status":"error","message":"Unauthorized"}"#);

    let (status, _) = get(state, "10.0.0.9:5000", "/restart").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(power.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_launch_failure_is_500() {
    let power = Arc::new(RecordingPower {
        fail: true,
        ..Default::default()
    });

    let (status, body) = get(state("[]", power), "10.0.0.9:5000", "/sleep?token=abc123").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"status":"error"}"#);
}

#[tokio::test]
async fn test_status_needs_no_token() {
    let power = Arc::new(RecordingPower::default());

    let (status, body) = get(state("[]", power), "10.0.0.9:5000", "/status").await;

    assert_eq!(status, StatusCode::OK);
    let body: AgentStatus = serde_json::from_str(&body).unwrap();
    assert_eq!(body.status, "running");
    assert_eq!(body.port, 8888);
    assert_eq!(body.os, std::env::consts::OS);
    assert!(body.uptime > 0);
    let expected = hostname::get().unwrap().into_string().unwrap();
    assert_eq!(body.hostname, expected);
    assert_ne!(body.hostname, "unknown");
    assert_ne!(body.os_version, "unknown");
}
