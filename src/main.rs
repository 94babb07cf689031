//! WebSocket Broadcast Hub - Entry Point
//!
//! Starts the Room actor and the TCP accept loop. Ctrl-C stops the Room,
//! which closes every client.

use std::env;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use broadcast_hub::{serve, HubConfig, Room};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=broadcast_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("broadcast_hub=info")),
        )
        .init();

    let config = HubConfig::from_env(env::args().skip(1))?;

    // Start TCP listener
    let listener = TcpListener::bind(&config.addr).await?;
    info!("Broadcast hub listening on {}", config.addr);

    let (room, room_task) = Room::spawn(config.room_capacity);

    tokio::select! {
        _ = serve(listener, room.clone(), config.client_options()) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down");
        }
    }

    room.stop().await?;
    room_task.await?;

    Ok(())
}
