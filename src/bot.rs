//! Moderation bot
//!
//! Server-wide automation hook. While active, greets every connection
//! that successfully joins a room.

use crate::message::ServerMessage;
use crate::room::ChatRoom;
use crate::types::Identity;

/// Display name the bot speaks under
pub const BOT_NAME: &str = "Bot";

#[derive(Debug, Default)]
pub struct ModerationBot {
    active: bool,
}

impl ModerationBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Turn the bot on, returning whether it was already active
    pub fn activate(&mut self) -> bool {
        std::mem::replace(&mut self.active, true)
    }

    /// Turn the bot off, returning whether it was active
    pub fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    /// Greeting for a connection that just joined `room`
    ///
    /// None while inactive, and for identities banned from the room.
    pub fn greeting(&self, room: &ChatRoom, identity: &Identity) -> Option<ServerMessage> {
        if !self.active || room.is_banned(identity) {
            return None;
        }
        Some(ServerMessage::BotGreeting {
            bot: BOT_NAME,
            identity: identity.clone(),
        })
    }
}
