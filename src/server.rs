//! Accept loop
//!
//! Spawns one handler task per accepted connection. Accept errors are
//! logged and the loop keeps going.

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ClientOptions;
use crate::handler::handle_connection;
use crate::room::RoomHandle;

/// Accept connections forever, handing each to `handle_connection`
pub async fn serve(listener: TcpListener, room: RoomHandle, options: ClientOptions) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let room = room.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, room, options).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
