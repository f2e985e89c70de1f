//! Room registry
//!
//! Owns every chat room, the connection → room membership index and the
//! moderation bot. All mutation happens through `&mut self`; the
//! `ChatServer` actor is the only owner, so operations are serialized
//! without locks.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::bot::ModerationBot;
use crate::connection::ConnectionHandle;
use crate::error::ChatError;
use crate::message::ServerMessage;
use crate::room::ChatRoom;
use crate::types::{ConnectionId, Identity, RoomName};

/// Result of a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Room the connection is now routed to
    pub room: RoomName,
    /// Bot greeting to deliver after the confirmation, if the bot is active
    pub greeting: Option<ServerMessage>,
}

#[derive(Debug, Clone, Copy)]
enum Sanction {
    Kick,
    Ban,
}

impl Sanction {
    fn verb(self) -> &'static str {
        match self {
            Sanction::Kick => "kicked",
            Sanction::Ban => "banned",
        }
    }
}

/// Registry of all chat rooms
///
/// A connection is a member of at most one room; `memberships` is the
/// routing index for it. Rooms are never removed.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// All rooms: RoomName -> ChatRoom
    rooms: HashMap<RoomName, ChatRoom>,
    /// Connection to room mapping: ConnectionId -> RoomName
    memberships: HashMap<ConnectionId, RoomName>,
    bot: ModerationBot,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty room
    pub fn create(&mut self, name: RoomName) -> Result<ServerMessage, ChatError> {
        if self.rooms.contains_key(&name) {
            return Err(ChatError::AlreadyExists);
        }

        info!("Room \"{}\" created", name);
        self.rooms.insert(name.clone(), ChatRoom::new(name.clone()));
        Ok(ServerMessage::Created { room: name })
    }

    /// Add a connection to a room
    ///
    /// A connection already in another room is moved out of it first.
    /// Every member, the joiner included, receives a join notice.
    pub fn join(
        &mut self,
        handle: &ConnectionHandle,
        name: &RoomName,
    ) -> Result<JoinOutcome, ChatError> {
        let room = self.rooms.get(name).ok_or(ChatError::RoomNotFound)?;
        if room.is_banned(handle.identity()) {
            info!(
                "Rejected banned identity {} from room \"{}\"",
                handle.identity(),
                name
            );
            return Err(ChatError::Banned(name.to_string()));
        }
        if self.memberships.get(&handle.id()) == Some(name) {
            return Err(ChatError::AlreadyMember(name.to_string()));
        }

        self.leave(handle);

        let Some(room) = self.rooms.get_mut(name) else {
            return Err(ChatError::RoomNotFound);
        };
        room.add_member(handle.clone());
        self.memberships.insert(handle.id(), name.clone());
        info!("{} {} joined room \"{}\"", handle.id(), handle.identity(), name);

        self.fan_out(
            name,
            &ServerMessage::JoinNotice {
                identity: handle.identity().clone(),
            },
        );
        // The joiner's own notice failed and it was evicted
        if !self.memberships.contains_key(&handle.id()) {
            return Err(ChatError::TransportWrite);
        }

        let greeting = self
            .rooms
            .get(name)
            .and_then(|room| self.bot.greeting(room, handle.identity()));

        Ok(JoinOutcome {
            room: name.clone(),
            greeting,
        })
    }

    /// Send a chat line from a member to its room, sender included
    ///
    /// Returns the number of members the line was delivered to.
    pub fn broadcast_from_member(
        &mut self,
        handle: &ConnectionHandle,
        text: &str,
    ) -> Result<usize, ChatError> {
        let room = self
            .memberships
            .get(&handle.id())
            .cloned()
            .ok_or(ChatError::NotInRoom)?;

        let msg = ServerMessage::Chat {
            from: handle.identity().clone(),
            text: text.to_string(),
        };
        Ok(self.fan_out(&room, &msg))
    }

    /// Remove the member matching `pattern` from the issuer's room
    pub fn kick(&mut self, issuer: &ConnectionHandle, pattern: &str) -> Result<Identity, ChatError> {
        self.sanction(issuer, pattern, Sanction::Kick)
    }

    /// Ban the identity matching `pattern` from the issuer's room, then remove it
    pub fn ban(&mut self, issuer: &ConnectionHandle, pattern: &str) -> Result<Identity, ChatError> {
        self.sanction(issuer, pattern, Sanction::Ban)
    }

    fn sanction(
        &mut self,
        issuer: &ConnectionHandle,
        pattern: &str,
        sanction: Sanction,
    ) -> Result<Identity, ChatError> {
        let name = self
            .memberships
            .get(&issuer.id())
            .cloned()
            .ok_or(ChatError::NotInRoom)?;
        let Some(room) = self.rooms.get_mut(&name) else {
            return Err(ChatError::NotInRoom);
        };

        let target = room.find_target(issuer.identity(), pattern)?;
        if let Sanction::Ban = sanction {
            room.ban(target.clone());
        }

        let removed = room.remove_identity(&target);
        for member in &removed {
            self.memberships.remove(&member.id());
            let notice = match sanction {
                Sanction::Kick => ServerMessage::Kicked { room: name.clone() },
                Sanction::Ban => ServerMessage::BannedFrom { room: name.clone() },
            };
            if member.write(notice).is_err() {
                debug!("Could not tell {} it was {}", member.id(), sanction.verb());
            }
        }

        info!(
            "{} {} {} from room \"{}\" ({} connection(s))",
            issuer.identity(),
            sanction.verb(),
            target,
            name,
            removed.len()
        );

        let by = issuer.identity().clone();
        let notice = match sanction {
            Sanction::Kick => ServerMessage::KickNotice {
                target: target.clone(),
                by,
            },
            Sanction::Ban => ServerMessage::BanNotice {
                target: target.clone(),
                by,
            },
        };
        self.fan_out(&name, &notice);

        Ok(target)
    }

    /// Send a message to the members of every room
    ///
    /// Returns the number of deliveries.
    pub fn notify_global(&mut self, msg: &ServerMessage) -> usize {
        let names: Vec<RoomName> = self.rooms.keys().cloned().collect();
        names.iter().map(|name| self.fan_out(name, msg)).sum()
    }

    /// Drop a connection from whatever room it is in
    ///
    /// Called on disconnect. Returns the room it was removed from.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<RoomName> {
        let name = self.memberships.remove(&id)?;
        if let Some(room) = self.rooms.get_mut(&name) {
            room.remove_member(id);
        }
        debug!("{} removed from room \"{}\"", id, name);
        Some(name)
    }

    /// Switch the moderation bot on or off, returning its previous state
    pub fn set_bot_active(&mut self, active: bool) -> bool {
        if active {
            self.bot.activate()
        } else {
            self.bot.deactivate()
        }
    }

    pub fn room(&self, name: &RoomName) -> Option<&ChatRoom> {
        self.rooms.get(name)
    }

    /// Room a connection is currently routed to
    pub fn room_of(&self, id: ConnectionId) -> Option<&RoomName> {
        self.memberships.get(&id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Move a connection out of its current room, telling those left behind
    fn leave(&mut self, handle: &ConnectionHandle) {
        if let Some(old) = self.unregister(handle.id()) {
            self.fan_out(
                &old,
                &ServerMessage::LeaveNotice {
                    identity: handle.identity().clone(),
                },
            );
        }
    }

    /// Broadcast to one room and evict members whose write failed
    ///
    /// Those left behind are told about each eviction. Returns the number
    /// of successful deliveries of `msg`.
    fn fan_out(&mut self, name: &RoomName, msg: &ServerMessage) -> usize {
        let Some(room) = self.rooms.get(name) else {
            return 0;
        };
        let failed = room.broadcast(&msg.to_string());
        let delivered = room.member_count() - failed.len();

        let mut gone = self.evict(name, failed);
        while let Some(identity) = gone.pop() {
            let Some(room) = self.rooms.get(name) else {
                break;
            };
            let failed = room.broadcast(&ServerMessage::LeaveNotice { identity }.to_string());
            gone.extend(self.evict(name, failed));
        }

        delivered
    }

    /// Remove members whose write failed, returning their identities
    fn evict(&mut self, name: &RoomName, failed: Vec<ConnectionId>) -> Vec<Identity> {
        let Some(room) = self.rooms.get_mut(name) else {
            return Vec::new();
        };

        let mut gone = Vec::with_capacity(failed.len());
        for id in failed {
            if let Some(member) = room.remove_member(id) {
                warn!(
                    "Evicting {} {} from room \"{}\": write failed",
                    id,
                    member.identity(),
                    name
                );
                gone.push(member.identity().clone());
            }
            self.memberships.remove(&id);
        }
        gone
    }
}
