//! Line protocol definitions
//!
//! Client lines are parsed into `ClientCommand`s; everything the server
//! says is a `ServerMessage` whose `Display` is the exact wire text.
//! The line terminator is added by the framing codec.

use std::fmt;

use crate::error::ChatError;
use crate::types::{Identity, RoomName};

/// Line a client sends while composing a message
pub const TYPING_SENTINEL: &str = "User is typing...";

/// Client → Server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `/create <room>`
    Create(RoomName),
    /// `/join <room>`
    Join(RoomName),
    /// `/msg <text>`
    Msg(String),
    /// `/kick <identity pattern>`
    Kick(String),
    /// `/ban <identity pattern>`
    Ban(String),
    /// `/addbot`
    AddBot,
    /// `/help`
    Help,
    /// The typing sentinel line
    Typing,
    /// Anything else
    Unknown,
}

impl ClientCommand {
    /// Parse one input line
    ///
    /// Fails only when a known command is missing its argument. Room names
    /// and kick/ban patterns are trimmed; `/msg` text is kept as typed.
    pub fn parse(line: &str) -> Result<Self, ChatError> {
        let line = line.trim_start();

        if line.trim_end() == TYPING_SENTINEL {
            return Ok(Self::Typing);
        }
        if !line.starts_with('/') {
            return Ok(Self::Unknown);
        }

        let (cmd, rest) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest),
            None => (line.trim_end(), ""),
        };
        let arg = rest.trim();

        let cmd = match cmd {
            "/create" => Self::Create(RoomName::from(required(arg, "/create <room>")?)),
            "/join" => Self::Join(RoomName::from(required(arg, "/join <room>")?)),
            "/msg" => {
                required(arg, "/msg <message>")?;
                Self::Msg(rest.to_string())
            }
            "/kick" => Self::Kick(required(arg, "/kick <user>")?.to_string()),
            "/ban" => Self::Ban(required(arg, "/ban <user>")?.to_string()),
            "/addbot" => Self::AddBot,
            "/help" => Self::Help,
            _ => Self::Unknown,
        };
        Ok(cmd)
    }
}

fn required<'a>(arg: &'a str, usage: &'static str) -> Result<&'a str, ChatError> {
    if arg.is_empty() {
        Err(ChatError::MissingArgument(usage))
    } else {
        Ok(arg)
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Room created successfully
    Created { room: RoomName },
    /// Room joined successfully
    Joined { room: RoomName },
    /// Someone joined the room
    JoinNotice { identity: Identity },
    /// Someone moved out of the room
    LeaveNotice { identity: Identity },
    /// Chat line from a member
    Chat { from: Identity, text: String },
    /// Global: connection came up
    Online { identity: Identity },
    /// Global: connection went away
    Offline { identity: Identity },
    /// Global: connection is typing
    Typing { identity: Identity },
    /// Sent to a kicked member
    Kicked { room: RoomName },
    /// Sent to a banned member
    BannedFrom { room: RoomName },
    /// Room-wide kick notice
    KickNotice { target: Identity, by: Identity },
    /// Room-wide ban notice
    BanNotice { target: Identity, by: Identity },
    /// Bot switched on
    BotAdded,
    /// Bot was already on
    BotAlreadyActive,
    /// Bot greeting for a new member
    BotGreeting { bot: &'static str, identity: Identity },
    /// Command listing
    Help,
    /// Unrecognized input
    Unknown,
    /// Command failed
    Error(ChatError),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { room } => write!(f, "Created chat room \"{room}\"."),
            Self::Joined { room } => write!(f, "Joined chat room \"{room}\"."),
            Self::JoinNotice { identity } => {
                write!(f, "Notice: {identity} joined the chat room.")
            }
            Self::LeaveNotice { identity } => write!(f, "Notice: {identity} left the chat room."),
            Self::Chat { from, text } => write!(f, "{from}: {text}"),
            Self::Online { identity } => write!(f, "Notice: {identity} is online."),
            Self::Offline { identity } => write!(f, "Notice: {identity} went offline."),
            Self::Typing { identity } => write!(f, "Notice: {identity} is typing..."),
            Self::Kicked { room } => write!(f, "You have been kicked from chat room \"{room}\"."),
            Self::BannedFrom { room } => {
                write!(f, "You have been banned from chat room \"{room}\".")
            }
            Self::KickNotice { target, by } => {
                write!(f, "Notice: {target} was kicked from the chat room by {by}.")
            }
            Self::BanNotice { target, by } => {
                write!(f, "Notice: {target} was banned from the chat room by {by}.")
            }
            Self::BotAdded => f.write_str("Bot added to the server."),
            Self::BotAlreadyActive => f.write_str("Bot is already active."),
            Self::BotGreeting { bot, identity } => write!(f, "{bot}: Hello, {identity}!"),
            Self::Help => f.write_str(
                "Commands:\n/create <room>\n/join <room>\n/msg <message>\n\
                 /kick <user>\n/ban <user>\n/addbot\n/help",
            ),
            Self::Unknown => f.write_str("Unknown command. Type /help for a list of commands."),
            Self::Error(err) => write!(f, "{err}"),
        }
    }
}

/// Convert ChatError to ServerMessage for client notification
impl From<ChatError> for ServerMessage {
    fn from(err: ChatError) -> Self {
        ServerMessage::Error(err)
    }
}

impl From<ServerMessage> for String {
    fn from(msg: ServerMessage) -> Self {
        msg.to_string()
    }
}
