//! Room actor implementation
//!
//! The single actor that owns the membership set and performs broadcast
//! fan-out. Every membership change and every broadcast goes through one
//! mpsc queue, so they are processed one at a time in a total order and
//! the set needs no lock.

use std::collections::HashMap;
use std::ops::ControlFlow;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ClientHandle;
use crate::error::HubError;
use crate::types::{ClientId, InboundMessage};

/// Commands processed by the Room actor
#[derive(Debug)]
pub enum RoomCommand {
    /// Admit a client to the membership set
    Join(ClientHandle),
    /// Fan a client's message out to every member, the sender included
    Broadcast(InboundMessage),
    /// Fan a hub-originated message out to every member
    Publish(String),
    /// A client's reader or writer has exited
    Departed(ClientId),
    /// Snapshot of the current member ids
    Members(oneshot::Sender<Vec<ClientId>>),
    /// Stop every member and clear the set; the Room keeps running
    Purge,
    /// Purge, then terminate the Room
    Stop,
}

/// Cloneable address of the Room actor
///
/// Every method fails with `HubError::RoomClosed` once the Room has
/// stopped. Commands still queued when it stopped are dropped.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn new(sender: mpsc::Sender<RoomCommand>) -> Self {
        Self { sender }
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), HubError> {
        self.sender.send(cmd).await.map_err(|_| HubError::RoomClosed)
    }

    pub async fn join(&self, client: ClientHandle) -> Result<(), HubError> {
        self.send(RoomCommand::Join(client)).await
    }

    pub async fn broadcast(&self, msg: InboundMessage) -> Result<(), HubError> {
        self.send(RoomCommand::Broadcast(msg)).await
    }

    pub async fn publish(&self, text: impl Into<String>) -> Result<(), HubError> {
        self.send(RoomCommand::Publish(text.into())).await
    }

    pub async fn departed(&self, client_id: ClientId) -> Result<(), HubError> {
        self.send(RoomCommand::Departed(client_id)).await
    }

    pub async fn purge(&self) -> Result<(), HubError> {
        self.send(RoomCommand::Purge).await
    }

    pub async fn stop(&self) -> Result<(), HubError> {
        self.send(RoomCommand::Stop).await
    }

    /// Current member ids, as of every command sent before this one
    pub async fn members(&self) -> Result<Vec<ClientId>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Members(tx)).await?;
        rx.await.map_err(|_| HubError::RoomClosed)
    }
}

/// The Room actor
///
/// Owns the authoritative membership set: `ClientId -> ClientHandle`.
pub struct Room {
    clients: HashMap<ClientId, ClientHandle>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl Room {
    /// Create a new Room with the given command receiver
    pub fn new(receiver: mpsc::Receiver<RoomCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            receiver,
        }
    }

    /// Create a Room and run it on its own task
    pub fn spawn(capacity: usize) -> (RoomHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(Room::new(rx).run());
        (RoomHandle::new(tx), task)
    }

    /// Run the Room event loop
    ///
    /// Processes commands until `Stop` arrives or every handle is dropped.
    pub async fn run(mut self) {
        info!("Room started");

        while let Some(cmd) = self.receiver.recv().await {
            if self.handle_command(cmd).await.is_break() {
                info!("Room closed");
                return;
            }
        }

        self.purge();
        info!("Room closed (all handles dropped)");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Join(client) => self.handle_join(client),
            RoomCommand::Broadcast(msg) => {
                debug!("Broadcast from {}: {:?}", msg.from, msg.text);
                self.fan_out(&msg.text).await;
            }
            RoomCommand::Publish(text) => {
                debug!("Publish: {:?}", text);
                self.fan_out(&text).await;
            }
            RoomCommand::Departed(client_id) => self.handle_departed(client_id),
            RoomCommand::Members(reply) => {
                let _ = reply.send(self.clients.keys().copied().collect());
            }
            RoomCommand::Purge => {
                info!("Purging {} clients", self.clients.len());
                self.purge();
            }
            RoomCommand::Stop => {
                info!("Stopping room with {} clients", self.clients.len());
                self.purge();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_join(&mut self, client: ClientHandle) {
        let client_id = client.id();
        if self.clients.insert(client_id, client).is_some() {
            warn!("Client {} joined twice, replacing", client_id);
        } else {
            info!("Client {} joined", client_id);
        }
        debug!("Total clients: {}", self.clients.len());
    }

    fn handle_departed(&mut self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_some() {
            info!("Client {} left", client_id);
            debug!("Total clients: {}", self.clients.len());
        }
    }

    /// Deliver `text` to every current member
    ///
    /// A member whose queue does not accept the message in time is stopped
    /// and removed right away.
    async fn fan_out(&mut self, text: &str) {
        let mut evicted = Vec::new();

        for (client_id, client) in &self.clients {
            if let Err(e) = client.send(text.to_owned()).await {
                warn!("Evicting client {}: {}", client_id, e);
                client.stop();
                evicted.push(*client_id);
            }
        }

        for client_id in evicted {
            self.clients.remove(&client_id);
        }
    }

    fn purge(&mut self) {
        for (_, client) in self.clients.drain() {
            client.stop();
        }
    }
}
