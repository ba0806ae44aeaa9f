//! Room Relay - Entry Point
//!
//! Parses the configuration, builds the room registry and serves the HTTP
//! and WebSocket routes until Ctrl+C.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use room_relay::{http, AppState, RoomRegistry, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("room_relay=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::parse();

    let listener = TcpListener::bind(config.bind_addr()).await?;
    let state = Arc::new(AppState::new(
        RoomRegistry::new(config.room_creation),
        config.session_config(),
    ));
    info!("Room creation policy: {:?}", config.room_creation);

    http::serve(listener, state, shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
