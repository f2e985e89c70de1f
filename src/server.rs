//! ChatServer Actor implementation
//!
//! The central actor that owns all shared state: live connections and the
//! room registry. Connection workers talk to it over an mpsc channel, so
//! every mutation is applied by a single task, one command at a time.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::connection::ConnectionHandle;
use crate::message::ServerMessage;
use crate::registry::RoomRegistry;
use crate::types::{ConnectionId, RoomName};

/// Commands sent from connection workers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection established
    Connect { handle: ConnectionHandle },
    /// Connection closed or failed
    Disconnect { id: ConnectionId },
    /// Create a new room
    Create { id: ConnectionId, room: RoomName },
    /// Join an existing room
    Join { id: ConnectionId, room: RoomName },
    /// Send a chat line to the current room
    Message { id: ConnectionId, text: String },
    /// Kick a member of the current room
    Kick { id: ConnectionId, target: String },
    /// Ban a member of the current room
    Ban { id: ConnectionId, target: String },
    /// Activate the moderation bot
    AddBot { id: ConnectionId },
    /// Connection is typing
    Typing { id: ConnectionId },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All live connections: ConnectionId -> ConnectionHandle
    connections: HashMap<ConnectionId, ConnectionHandle>,
    registry: RoomRegistry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            connections: HashMap::new(),
            registry: RoomRegistry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { handle } => self.handle_connect(handle),
            ServerCommand::Disconnect { id } => self.handle_disconnect(id),
            ServerCommand::Create { id, room } => self.handle_create(id, room),
            ServerCommand::Join { id, room } => self.handle_join(id, room),
            ServerCommand::Message { id, text } => self.handle_message(id, text),
            ServerCommand::Kick { id, target } => self.handle_kick(id, target, false),
            ServerCommand::Ban { id, target } => self.handle_kick(id, target, true),
            ServerCommand::AddBot { id } => self.handle_add_bot(id),
            ServerCommand::Typing { id } => self.handle_typing(id),
        }
    }

    /// Handle new connection
    fn handle_connect(&mut self, handle: ConnectionHandle) {
        info!("Connection {} ({}) online", handle.id(), handle.identity());

        self.registry.notify_global(&ServerMessage::Online {
            identity: handle.identity().clone(),
        });
        self.connections.insert(handle.id(), handle);

        debug!(
            "Total connections: {}, Total rooms: {}",
            self.connections.len(),
            self.registry.room_count()
        );
    }

    /// Handle disconnection
    ///
    /// Purges room membership before announcing the departure.
    fn handle_disconnect(&mut self, id: ConnectionId) {
        let Some(handle) = self.connections.remove(&id) else {
            return;
        };

        if let Some(room) = self.registry.unregister(id) {
            debug!("Connection {} left room \"{}\" on disconnect", id, room);
        }
        info!("Connection {} ({}) offline", id, handle.identity());

        self.registry.notify_global(&ServerMessage::Offline {
            identity: handle.identity().clone(),
        });
    }

    /// Handle room creation
    fn handle_create(&mut self, id: ConnectionId, room: RoomName) {
        let Some(handle) = self.connections.get(&id) else {
            return;
        };

        match self.registry.create(room) {
            Ok(reply) => send(handle, reply),
            Err(e) => send(handle, e),
        }
    }

    /// Handle room joining
    fn handle_join(&mut self, id: ConnectionId, room: RoomName) {
        let Some(handle) = self.connections.get(&id) else {
            return;
        };

        match self.registry.join(handle, &room) {
            Ok(outcome) => {
                send(handle, ServerMessage::Joined { room: outcome.room });
                if let Some(greeting) = outcome.greeting {
                    send(handle, greeting);
                }
            }
            Err(e) => send(handle, e),
        }
    }

    /// Handle chat message
    fn handle_message(&mut self, id: ConnectionId, text: String) {
        let Some(handle) = self.connections.get(&id) else {
            return;
        };

        match self.registry.broadcast_from_member(handle, &text) {
            Ok(delivered) => debug!("Message from {} delivered to {} member(s)", id, delivered),
            Err(e) => send(handle, e),
        }
    }

    /// Handle kick or ban
    fn handle_kick(&mut self, id: ConnectionId, target: String, ban: bool) {
        let Some(handle) = self.connections.get(&id) else {
            return;
        };

        let result = if ban {
            self.registry.ban(handle, &target)
        } else {
            self.registry.kick(handle, &target)
        };
        if let Err(e) = result {
            send(handle, e);
        }
    }

    /// Handle bot activation
    fn handle_add_bot(&mut self, id: ConnectionId) {
        let Some(handle) = self.connections.get(&id) else {
            return;
        };

        if self.registry.set_bot_active(true) {
            send(handle, ServerMessage::BotAlreadyActive);
        } else {
            info!("Moderation bot activated by {}", handle.identity());
            send(handle, ServerMessage::BotAdded);
        }
    }

    /// Handle typing indicator
    fn handle_typing(&mut self, id: ConnectionId) {
        let Some(handle) = self.connections.get(&id) else {
            return;
        };

        self.registry.notify_global(&ServerMessage::Typing {
            identity: handle.identity().clone(),
        });
    }
}

/// Write a reply to one connection, ignoring a dead peer
fn send(handle: &ConnectionHandle, msg: impl Into<ServerMessage>) {
    let msg: ServerMessage = msg.into();
    if handle.write(msg).is_err() {
        debug!("Dropped reply to {}: write failed", handle.id());
    }
}
