//! Multi-room TLS Chat Server Library
//!
//! A line-protocol chat server built on tokio, with named rooms,
//! kick/ban moderation and an optional greeting bot.
//!
//! # Features
//! - TLS transport with optional client certificate verification
//! - Room creation and joining
//! - Room-wide chat fan-out
//! - Kick and identity-keyed bans
//! - Global online/offline/typing notices
//! - Moderation bot greeting new members
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the `RoomRegistry`
//! - Each connection has a `handler` worker communicating with the server
//! - Outbound lines go through a bounded per-connection queue, so a slow
//!   client never blocks a broadcast
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use roomcast::{handle_connection, ChatServer, Identity, IdentityMode, LimitsConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:3334").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, addr)) = listener.accept().await {
//!         let identity = Identity::from_peer(addr, IdentityMode::Address);
//!         tokio::spawn(handle_connection(stream, identity, cmd_tx.clone(), LimitsConfig::default()));
//!     }
//! }
//! ```

pub mod bot;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod tls;
pub mod types;

// Re-export main types for convenience
pub use bot::ModerationBot;
pub use config::{Config, LimitsConfig};
pub use connection::ConnectionHandle;
pub use error::{AppError, ChatError};
pub use handler::handle_connection;
pub use message::{ClientCommand, ServerMessage};
pub use registry::{JoinOutcome, RoomRegistry};
pub use room::ChatRoom;
pub use server::{ChatServer, ServerCommand};
pub use types::{ConnectionId, Identity, IdentityMode, RoomName};
