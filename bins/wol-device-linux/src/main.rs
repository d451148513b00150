use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wol_core::{
    BootClock, ConnectivityFailure, ControlLoop, Device, DeviceConfig, Ports, TraceIndicator, UdpWakeTransport,
};
use wol_web::{create_device_router, HostIdentity, HostLink, HttpRelay};

const DEFAULT_CONFIG: &str = "config/device.json";
const LOOP_PAUSE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,wol_core=debug,wol_web=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WOL_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = DeviceConfig::load(&path).with_context(|| format!("loading {}", path))?;
    tracing::info!("Wake-on-LAN device starting with {}", path);

    let probe = config
        .target
        .broadcast_ip
        .parse::<Ipv4Addr>()
        .unwrap_or(Ipv4Addr::BROADCAST);
    let interface = std::env::var("WOL_INTERFACE").ok();
    let http_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.esp.http_port));

    let device = Device::new(
        config,
        Ports {
            clock: Box::new(BootClock::new()),
            wake: Box::new(UdpWakeTransport),
            relay: Box::new(HttpRelay),
            identity: Box::new(HostIdentity::new(probe, interface)),
            indicator: Box::new(TraceIndicator),
        },
    )
    .into_shared();

    let mut control = ControlLoop::new(device.clone(), HostLink::new(probe), Box::new(BootClock::new()));
    let mut control = tokio::task::spawn_blocking(move || {
        control
            .startup(&mut |ms| std::thread::sleep(Duration::from_millis(u64::from(ms))))
            .map(|()| control)
    })
    .await??;

    // Control loop on the blocking pool
    let running = Arc::new(AtomicBool::new(true));
    let loop_running = running.clone();
    let loop_handle = tokio::task::spawn_blocking(move || -> Result<(), ConnectivityFailure> {
        while loop_running.load(Ordering::Relaxed) {
            control.tick()?;
            std::thread::sleep(LOOP_PAUSE);
        }
        Ok(())
    });

    // HTTP server
    let app = create_device_router(device).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding {}", http_addr))?;
    tracing::info!("HTTP server listening on {}", http_addr);
    let http_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
        res = loop_handle => {
            match res? {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::error!("Connectivity lost: {}", e);
                    Err(anyhow::Error::new(e).context("device must restart"))
                }
            }
        }
        res = http_handle => {
            tracing::warn!("HTTP server stopped");
            res?.context("HTTP server")
        }
    };

    running.store(false, Ordering::Relaxed);
    tracing::info!("Shutdown complete");
    result
}
