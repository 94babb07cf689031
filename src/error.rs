//! Error types for the broadcast hub
//!
//! Defines application-level errors, per-client send errors and
//! connection I/O errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Returned by the connection glue and by `RoomHandle` operations.
/// None of these ever reach the Room's control loop as a fault.
#[derive(Debug, Error)]
pub enum HubError {
    /// WebSocket protocol error (upgrade failed or similar)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The Room has stopped and no longer accepts commands
    #[error("Room closed")]
    RoomClosed,

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors from a bounded send into a client's outbound queue
///
/// Either way the Room treats the client as gone and evicts it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The queue did not accept the message within the send timeout
    #[error("Can't send to client: unresponsive")]
    Unresponsive,

    /// The client's writer has gone away
    #[error("Can't send to client: disconnected")]
    Disconnected,
}

/// Errors from reading or writing a single connection
///
/// Terminal for the owning client; there is no retry.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Transport-level failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The peer closed the connection or the stream ended
    #[error("Connection closed")]
    Closed,
}
