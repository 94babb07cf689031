//! Connection handler
//!
//! Routes one accepted TCP connection: status requests are answered
//! directly, everything else goes through the WebSocket handshake and
//! becomes a `Client` registered with the Room.

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, info};

use crate::client::Client;
use crate::config::ClientOptions;
use crate::connection;
use crate::error::HubError;
use crate::room::RoomHandle;
use crate::status;
use crate::types::ClientId;

/// Path the WebSocket endpoint is served on
pub const WS_PATH: &str = "/ws";

/// Handle a new TCP connection
///
/// Returns once the client has fully closed. An upgrade failure is
/// returned to the caller and never reaches the Room.
pub async fn handle_connection(
    stream: TcpStream,
    room: RoomHandle,
    options: ClientOptions,
) -> Result<(), HubError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    if status::is_status_request(&stream).await? {
        debug!("Status request from {}", peer_addr);
        return status::respond(stream).await;
    }

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;
    let (reader, writer) = connection::split(ws_stream);

    let client = Client::new(ClientId::new(), reader, writer, options);
    let client_id = client.id();
    info!("Client {} connected from {}", client_id, peer_addr);

    let tasks = client.start(&room).await?;
    tasks.join().await;

    debug!("Connection from {} finished", peer_addr);
    Ok(())
}

/// Handshake callback: only the WebSocket path may upgrade
fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == WS_PATH {
        return Ok(response);
    }

    debug!("Rejecting upgrade on {}", request.uri().path());
    let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> Request {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[test]
    fn test_ws_path_accepted() {
        assert!(check_path(&request("/ws"), Response::new(())).is_ok());
        assert!(check_path(&request("/ws?room=main"), Response::new(())).is_ok());
    }

    #[test]
    fn test_other_paths_rejected() {
        let rejection = check_path(&request("/chat"), Response::new(())).unwrap_err();
        assert_eq!(rejection.status(), StatusCode::NOT_FOUND);
    }
}
