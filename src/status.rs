//! Liveness endpoint
//!
//! `GET /stat` is answered with a fixed JSON body on the same port as the
//! WebSocket endpoint. It never talks to the Room.

use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::HubError;

pub const STATUS_PATH: &str = "/stat";

const PEEK_LIMIT: usize = 128;
const PEEK_RETRY: Duration = Duration::from_millis(5);
const PEEK_ATTEMPTS: usize = 100;

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

/// Extract the request target from the start of an HTTP request
fn request_path(head: &[u8]) -> Option<&[u8]> {
    let mut parts = head.splitn(3, |b| *b == b' ');
    let _method = parts.next()?;
    let target = parts.next()?;
    // The request line must be complete up to the target
    parts.next()?;
    Some(target)
}

/// Check the request target for the status path, ignoring any query string
pub(crate) fn is_status_path(head: &[u8]) -> bool {
    match request_path(head) {
        Some(target) => {
            let path = target.split(|b| *b == b'?').next().unwrap_or(target);
            path == STATUS_PATH.as_bytes()
        }
        None => false,
    }
}

/// Whether enough of the request has arrived to decide on the route
fn head_complete(head: &[u8]) -> bool {
    head.len() >= PEEK_LIMIT
        || request_path(head).is_some()
        || head.windows(2).any(|w| w == b"\r\n")
}

/// Peek at the request line without consuming it
///
/// The request line may arrive over several segments, so peeking repeats
/// until it is complete, the buffer is full or the peer stops sending.
/// Anything that isn't a status request is left untouched for the
/// WebSocket handshake.
pub async fn is_status_request(stream: &TcpStream) -> Result<bool, HubError> {
    let mut buf = [0u8; PEEK_LIMIT];
    let mut n = stream.peek(&mut buf).await?;

    for _ in 0..PEEK_ATTEMPTS {
        if n == 0 || head_complete(&buf[..n]) {
            break;
        }
        tokio::time::sleep(PEEK_RETRY).await;
        n = stream.peek(&mut buf).await?;
    }

    Ok(is_status_path(&buf[..n]))
}

/// Answer a status request and close the connection
pub async fn respond(mut stream: TcpStream) -> Result<(), HubError> {
    // Drain the request head so closing doesn't reset the connection
    let mut request = [0u8; 1024];
    let mut len = 0;
    let drained = tokio::time::timeout(PEEK_RETRY * PEEK_ATTEMPTS as u32, async {
        while len < request.len() && !request[..len].windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut request[len..]).await? {
                0 => break,
                n => len += n,
            }
        }
        Ok::<_, std::io::Error>(())
    })
    .await;
    if let Ok(result) = drained {
        result?;
    }

    let body = serde_json::to_string(&StatusBody { status: "working" })?;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
