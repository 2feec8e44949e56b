//! # parley
//!
//! Signaling relay binary: serves the `/comm` WebSocket endpoint that pairs
//! of WebRTC peers use to negotiate a call, plus health/stats for monitoring.

use std::net::SocketAddr;

use parley_common::config;
use parley_hub::SignalHub;
use parley_server::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = config::init()?;

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("🚀 Starting parley v{}", env!("CARGO_PKG_VERSION"));

    let hub = SignalHub::new(config.hub.clone());
    let state = AppState {
        hub,
        outbound_queue: config.hub.outbound_queue,
    };
    let router = build_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("📡 Signaling server listening on ws://{addr}/comm");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
