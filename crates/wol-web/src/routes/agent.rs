//! Companion agent routes.
//!
//! Runs on the controlled machine and executes power commands relayed by
//! the device.
//!
//! # Endpoints
//!
//! ### `GET /status`
//! Host name, OS and the current Unix time. No authentication.
//!
//! ### `GET /sleep?token=T`, `GET /shutdown?token=T`, `GET /restart?token=T`
//! 403 if the caller's address is not allowed, 401 on a missing or wrong
//! token, otherwise launches the OS command and answers 200 (or 500 if it
//! could not be launched).

use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, MethodRouter},
    Router,
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use sysinfo::System;
use wol_core::config::AgentConfig;
use wol_core::messages::{AgentReply, AgentStatus};
use wol_core::{check_token, PowerAction};

use crate::power::PowerControl;

/// Shared state for agent handlers.
#[derive(Clone)]
pub struct AgentState {
    pub token: String,
    pub port: u16,
    /// Empty allows every peer.
    pub allowed_ips: Vec<IpAddr>,
    pub power: Arc<dyn PowerControl>,
}

impl AgentState {
    /// Build from config. Unparseable allow-list entries are skipped with a warning.
    pub fn new(config: &AgentConfig, power: Arc<dyn PowerControl>) -> Self {
        let allowed_ips = config
            .host
            .allowed_ips
            .iter()
            .filter_map(|raw| match raw.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!("Ignoring invalid allowed IP: {}", raw);
                    None
                }
            })
            .collect();
        Self {
            token: config.esp.token.clone(),
            port: config.host.port,
            allowed_ips,
            power,
        }
    }

    fn peer_allowed(&self, peer: IpAddr) -> bool {
        self.allowed_ips.is_empty() || self.allowed_ips.contains(&peer.to_canonical())
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Create the companion agent router.
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_agent_router(state: AgentState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/sleep", power_route(PowerAction::Sleep))
        .route("/shutdown", power_route(PowerAction::Shutdown))
        .route("/restart", power_route(PowerAction::Restart))
        .with_state(state)
}

fn power_route(action: PowerAction) -> MethodRouter<AgentState> {
    get(
        move |State(state): State<AgentState>,
              ConnectInfo(peer): ConnectInfo<SocketAddr>,
              Query(query): Query<TokenQuery>| async move {
            run_power(&state, peer.ip(), query.token.as_deref(), action)
        },
    )
}

fn run_power(
    state: &AgentState,
    peer: IpAddr,
    token: Option<&str>,
    action: PowerAction,
) -> (StatusCode, Json<AgentReply>) {
    if !state.peer_allowed(peer) {
        tracing::warn!(%peer, %action, "forbidden peer");
        return (
            StatusCode::FORBIDDEN,
            Json(AgentReply::error(Some("Forbidden: IP not allowed"))),
        );
    }
    if check_token(&state.token, token).is_err() {
        tracing::warn!(%peer, %action, "unauthorized");
        return (
            StatusCode::UNAUTHORIZED,
            Json(AgentReply::error(Some("Unauthorized"))),
        );
    }

    match state.power.execute(action) {
        Ok(()) => {
            tracing::info!(%peer, %action, "power command started");
            (StatusCode::OK, Json(AgentReply::success()))
        }
        Err(e) => {
            tracing::error!("{} failed: {}", action, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(AgentReply::error(None)))
        }
    }
}

async fn status(State(state): State<AgentState>) -> Json<AgentStatus> {
    Json(AgentStatus {
        status: "running".to_string(),
        hostname: hostname(),
        os: std::env::consts::OS.to_string(),
        os_version: os_version(),
        port: state.port,
        uptime: chrono::Utc::now().timestamp(),
    })
}

fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn os_version() -> String {
    System::os_version()
        .or_else(System::kernel_version)
        .unwrap_or_else(|| "unknown".to_string())
}
