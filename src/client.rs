//! Client definitions
//!
//! A `Client` is one accepted connection before it is started. Starting it
//! registers a `ClientHandle` with the Room and spawns the reader and writer
//! tasks. The handle is the only way anything delivers data to a client.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;
use tracing::error;

use crate::config::ClientOptions;
use crate::connection::{ConnectionReader, ConnectionWriter};
use crate::error::{HubError, SendError};
use crate::room::RoomHandle;
use crate::signal::StopSignal;
use crate::tasks::{run_reader, run_writer};
use crate::types::ClientId;

/// Client lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientState {
    /// Connection accepted, tasks not started
    Created = 0,
    /// Reader and writer running
    Active = 1,
    /// Stop requested, tasks winding down
    Stopping = 2,
    /// Both tasks have exited
    Closed = 3,
}

impl ClientState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Active,
            2 => Self::Stopping,
            _ => Self::Closed,
        }
    }
}

/// State shared between a client's tasks and every handle to it
#[derive(Debug)]
pub(crate) struct Control {
    stop: StopSignal,
    state: AtomicU8,
    live_tasks: AtomicU8,
}

impl Control {
    fn new() -> Self {
        Self {
            stop: StopSignal::new(),
            state: AtomicU8::new(ClientState::Created as u8),
            live_tasks: AtomicU8::new(2),
        }
    }

    fn activate(&self) {
        let _ = self.state.compare_exchange(
            ClientState::Created as u8,
            ClientState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn stop(&self) -> bool {
        if !self.stop.stop() {
            return false;
        }
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state < ClientState::Stopping as u8).then_some(ClientState::Stopping as u8)
            });
        true
    }

    pub(crate) async fn stopped(&self) {
        self.stop.stopped().await
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub(crate) fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Record that one of the two tasks has exited
    ///
    /// Called after the task has sent its departure to the Room. Returns
    /// `true` for the exit that closed the client.
    pub(crate) fn task_exited(&self) -> bool {
        self.stop();
        if self.live_tasks.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.store(ClientState::Closed as u8, Ordering::Release);
            true
        } else {
            false
        }
    }
}

/// The Room's view of a connected client
///
/// Cheap to clone. Holds the producer side of the outbound queue and the
/// shared stop signal, never the connection itself.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    outbound: mpsc::Sender<String>,
    send_timeout: Duration,
    control: Arc<Control>,
}

impl ClientHandle {
    pub(crate) fn new(id: ClientId, outbound: mpsc::Sender<String>, send_timeout: Duration) -> Self {
        Self {
            id,
            outbound,
            send_timeout,
            control: Arc::new(Control::new()),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Enqueue a message for this client
    ///
    /// Fails with `SendError::Unresponsive` if the outbound queue does not
    /// accept the message within the send timeout.
    pub async fn send(&self, text: String) -> Result<(), SendError> {
        self.outbound
            .send_timeout(text, self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SendError::Unresponsive,
                SendTimeoutError::Closed(_) => SendError::Disconnected,
            })
    }

    /// Ask the client's tasks to terminate
    ///
    /// Safe to call any number of times from anywhere. Returns `true` only
    /// for the call that actually stopped the client.
    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }

    pub fn state(&self) -> ClientState {
        self.control.state()
    }
}

/// Join handles for a started client's tasks
#[derive(Debug)]
pub struct ClientTasks {
    pub client_id: ClientId,
    pub reader: JoinHandle<()>,
    pub writer: JoinHandle<()>,
}

impl ClientTasks {
    /// Wait for both tasks to exit
    ///
    /// A task that panicked is logged; the other one is still awaited.
    pub async fn join(self) {
        for (name, task) in [("reader", self.reader), ("writer", self.writer)] {
            if let Err(e) = task.await {
                error!("Client {} {} task failed: {}", self.client_id, name, e);
            }
        }
    }
}

/// A connected peer that has not been started yet
pub struct Client<R, W> {
    handle: ClientHandle,
    reader: R,
    writer: W,
    outbound: mpsc::Receiver<String>,
}

impl<R, W> Client<R, W>
where
    R: ConnectionReader,
    W: ConnectionWriter,
{
    /// Create a new client over the given connection halves
    pub fn new(id: ClientId, reader: R, writer: W, options: ClientOptions) -> Self {
        let (tx, rx) = mpsc::channel(options.outbound_capacity);
        Self {
            handle: ClientHandle::new(id, tx, options.send_timeout),
            reader,
            writer,
            outbound: rx,
        }
    }

    pub fn id(&self) -> ClientId {
        self.handle.id
    }

    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Register with the Room, then spawn the reader and writer tasks
    ///
    /// Joining first means nothing this client sends can reach the Room
    /// ahead of its own Join.
    pub async fn start(self, room: &RoomHandle) -> Result<ClientTasks, HubError> {
        let Client {
            handle,
            reader,
            writer,
            outbound,
        } = self;
        let id = handle.id;
        let control = handle.control.clone();

        room.join(handle).await?;
        control.activate();

        let reader = tokio::spawn(run_reader(reader, id, control.clone(), room.clone()));
        let writer = tokio::spawn(run_writer(writer, outbound, id, control, room.clone()));

        Ok(ClientTasks {
            client_id: id,
            reader,
            writer,
        })
    }
}
