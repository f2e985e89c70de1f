//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: process-unique numeric connection identifier
//! - `Identity`: peer-derived name, also the ban-list key
//! - `RoomName`: chat room key

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique connection identifier (newtype pattern)
///
/// Allocated from a global counter, so ids are never reused and sort by
/// connection age. Implements Hash, Eq and Ord for use as map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Allocate the next connection ID
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a connection's identity is derived from its peer address
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// `ip:port`, distinct per connection
    #[default]
    Address,
    /// Bare IP, shared by every connection from the same host
    Ip,
}

/// Stable name of a connection
///
/// Shown to other members and used as the key of per-room ban lists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(pub String);

impl Identity {
    /// Derive an identity from a peer address
    pub fn from_peer(addr: SocketAddr, mode: IdentityMode) -> Self {
        match mode {
            IdentityMode::Address => Self(addr.to_string()),
            IdentityMode::Ip => Self(addr.ip().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat room name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(pub String);

impl From<&str> for RoomName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique_and_increasing() {
        let id1 = ConnectionId::next();
        let id2 = ConnectionId::next();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn test_identity_from_peer_address() {
        let addr: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        assert_eq!(
            Identity::from_peer(addr, IdentityMode::Address).as_str(),
            "10.0.0.7:51234"
        );
        assert_eq!(Identity::from_peer(addr, IdentityMode::Ip).as_str(), "10.0.0.7");
    }

    #[test]
    fn test_identity_ip_mode_survives_reconnect() {
        let first: SocketAddr = "192.168.1.2:40000".parse().unwrap();
        let second: SocketAddr = "192.168.1.2:40001".parse().unwrap();
        assert_eq!(
            Identity::from_peer(first, IdentityMode::Ip),
            Identity::from_peer(second, IdentityMode::Ip)
        );
        assert_ne!(
            Identity::from_peer(first, IdentityMode::Address),
            Identity::from_peer(second, IdentityMode::Address)
        );
    }
}
