//! WebSocket Broadcast Hub Library
//!
//! Every text message received from one client is re-delivered to every
//! connected client, the sender included.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Room` is the single actor owning the membership set
//! - Each client runs a reader task (connection -> Room) and a writer
//!   task (outbound queue -> connection)
//! - No locks needed - membership is only touched by the Room task
//! - A client whose outbound queue doesn't accept a message within the
//!   send timeout is stopped and evicted on the spot
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use broadcast_hub::{serve, HubConfig, Room};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = HubConfig::default();
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     let (room, _room_task) = Room::spawn(config.room_capacity);
//!
//!     serve(listener, room, config.client_options()).await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod room;
pub mod server;
pub mod signal;
pub mod status;
mod tasks;
pub mod types;

// Re-export main types for convenience
pub use client::{Client, ClientHandle, ClientState, ClientTasks};
pub use config::{ClientOptions, HubConfig};
pub use connection::{ConnectionReader, ConnectionWriter};
pub use error::{ConnectionError, HubError, SendError};
pub use handler::handle_connection;
pub use room::{Room, RoomCommand, RoomHandle};
pub use server::serve;
pub use types::{ClientId, InboundMessage};
