//! Arena Host - authoritative room server for a phone-controlled arena shooter
//!
//! The process is the stream screen of one room and holds host authority.
//! It handles:
//! - The host simulation (round lifecycle, combat, spawns, ranking)
//! - Field replication between the host and phone controllers
//! - WebSocket connections for controllers and screens
//! - HTTP endpoints for the leaderboard and the host console

mod app;
mod config;
mod game;
mod http;
mod sync;
mod util;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::Room;
use crate::http::build_router;
use crate::sync::{Authority, MemoryTransport, Session, StreamSession, Transport};
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Arena Host");
    info!("Server address: {}", config.server_addr);

    // The stream screen opens the room, so it is the host
    let session = StreamSession::host();
    let authority = Authority::from_session(&session);
    info!(peer_id = %session.local_peer(), host = authority.is_host(), "Session opened");
    let Authority::Host(host) = authority else {
        anyhow::bail!("stream session was not granted host authority");
    };

    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let (room, room_handle) = Room::new(host, transport, session.local_peer(), &config.room);
    tokio::spawn(room.run());

    // Create application state
    let state = AppState::new(config.clone(), room_handle);

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(true)))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
