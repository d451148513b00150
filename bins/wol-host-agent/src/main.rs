use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wol_core::AgentConfig;
use wol_web::{create_agent_router, AgentState, SystemPower};

const DEFAULT_CONFIG: &str = "config/device.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,wol_web=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WOL_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    // Refuses an empty token, so the agent never runs unauthenticated.
    let config = AgentConfig::load(&path).with_context(|| format!("loading {}", path))?;

    let state = AgentState::new(&config, Arc::new(SystemPower::new()));
    if state.allowed_ips.is_empty() {
        tracing::warn!("No allowed_ips configured; accepting commands from any address");
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.host.port));
    let app = create_agent_router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Companion agent listening on {}", addr);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        res = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
            res.context("HTTP server")?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
