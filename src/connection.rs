//! Connection boundary
//!
//! A connection is split into a read half and a write half so the reader
//! and writer tasks can own one each. The production implementation wraps
//! the two halves of a tokio-tungstenite `WebSocketStream`.

use std::future::Future;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

use crate::error::ConnectionError;

/// How long a close handshake may take before the sink is dropped anyway
///
/// A peer that stopped reading never lets the close frame flush.
pub const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Read half of a connection
pub trait ConnectionReader: Send + 'static {
    /// Read the next text message
    ///
    /// Must be cancel-safe: the reader task drops this future when the
    /// client is stopped.
    fn read(&mut self) -> impl Future<Output = Result<String, ConnectionError>> + Send;
}

/// Write half of a connection
pub trait ConnectionWriter: Send + 'static {
    /// Write one text message
    fn write(&mut self, text: String) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Close the connection. Errors are ignored; the connection is gone either way.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

type WsStream = WebSocketStream<TcpStream>;

/// Read half of an upgraded WebSocket
pub struct WsReader(SplitStream<WsStream>);

/// Write half of an upgraded WebSocket
pub struct WsWriter(SplitSink<WsStream, Message>);

/// Split an upgraded WebSocket into reader and writer halves
pub fn split(ws_stream: WsStream) -> (WsReader, WsWriter) {
    let (sink, stream) = ws_stream.split();
    (WsReader(stream), WsWriter(sink))
}

impl ConnectionReader for WsReader {
    async fn read(&mut self) -> Result<String, ConnectionError> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(String::from_utf8_lossy(&data).into_owned())
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Close frame received: {:?}", frame);
                    return Err(ConnectionError::Closed);
                }
                // Pong replies are queued by tungstenite and flushed with the next write
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ConnectionError::Closed),
            }
        }
    }
}

impl ConnectionWriter for WsWriter {
    async fn write(&mut self, text: String) -> Result<(), ConnectionError> {
        self.0.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if tokio::time::timeout(CLOSE_TIMEOUT, self.0.close()).await.is_err() {
            debug!("Close handshake timed out, dropping connection");
        }
    }
}
