//! Reader and writer tasks
//!
//! Each started client runs one of each. They bridge the connection to
//! the queues and never touch Room state: the reader produces into the
//! Room's queue, the writer consumes the client's outbound queue.
//!
//! Either task exiting stops the other. The writer always closes the
//! connection on its way out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Control;
use crate::connection::{ConnectionReader, ConnectionWriter};
use crate::room::RoomHandle;
use crate::types::{ClientId, InboundMessage};

/// Forward everything read from the connection to the Room
pub(crate) async fn run_reader<R: ConnectionReader>(
    mut conn: R,
    client_id: ClientId,
    control: Arc<Control>,
    room: RoomHandle,
) {
    loop {
        let result = tokio::select! {
            result = conn.read() => result,
            _ = control.stopped() => {
                debug!("Reader for {} stopped", client_id);
                break;
            }
        };

        match result {
            Ok(text) => {
                if room.broadcast(InboundMessage::new(client_id, text)).await.is_err() {
                    debug!("Room closed, ending reader for {}", client_id);
                    break;
                }
            }
            Err(e) => {
                debug!("Read failed for {}: {}", client_id, e);
                break;
            }
        }
    }

    control.stop();
    finish(client_id, &control, &room).await;
}

/// Write queued messages to the connection until stopped or the write fails
pub(crate) async fn run_writer<W: ConnectionWriter>(
    mut conn: W,
    mut outbound: mpsc::Receiver<String>,
    client_id: ClientId,
    control: Arc<Control>,
    room: RoomHandle,
) {
    loop {
        // Stop wins over pending messages; they are dropped, not flushed.
        let text = tokio::select! {
            biased;
            _ = control.stopped() => break,
            msg = outbound.recv() => match msg {
                Some(text) => text,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = control.stopped() => break,
            result = conn.write(text) => {
                if let Err(e) = result {
                    warn!("Write failed for {}: {}", client_id, e);
                    break;
                }
            }
        }
    }

    debug!("Writer for {} ended", client_id);
    control.stop();
    conn.close().await;
    finish(client_id, &control, &room).await;
}

/// Tell the Room, then record the exit, so `Closed` implies both departures were sent
async fn finish(client_id: ClientId, control: &Control, room: &RoomHandle) {
    if room.departed(client_id).await.is_err() {
        debug!("Room closed before departure of {}", client_id);
    }
    if control.task_exited() {
        info!("Client {} is closed", client_id);
    }
}
