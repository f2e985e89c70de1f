//! ChatRoom struct definition
//!
//! Represents a named chat room with its members and ban list.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::connection::ConnectionHandle;
use crate::error::ChatError;
use crate::types::{ConnectionId, Identity, RoomName};

/// Named chat room
///
/// Members are keyed by connection ID, so iteration runs oldest
/// connection first. Bans are keyed by identity and outlive membership.
#[derive(Debug)]
pub struct ChatRoom {
    /// Room name (unique within the registry)
    pub name: RoomName,
    members: BTreeMap<ConnectionId, ConnectionHandle>,
    banned: HashSet<Identity>,
}

impl ChatRoom {
    /// Create an empty room
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: BTreeMap::new(),
            banned: HashSet::new(),
        }
    }

    /// Add a member
    ///
    /// Returns false if the connection was already a member.
    pub fn add_member(&mut self, handle: ConnectionHandle) -> bool {
        self.members.insert(handle.id(), handle).is_none()
    }

    pub fn remove_member(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.members.remove(&id)
    }

    /// Remove every member carrying `identity`
    pub fn remove_identity(&mut self, identity: &Identity) -> Vec<ConnectionHandle> {
        let ids: Vec<ConnectionId> = self
            .members
            .values()
            .filter(|m| m.identity() == identity)
            .map(ConnectionHandle::id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.members.remove(&id))
            .collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    /// Add an identity to the ban list
    ///
    /// Returns false if it was already banned.
    pub fn ban(&mut self, identity: Identity) -> bool {
        self.banned.insert(identity)
    }

    pub fn is_banned(&self, identity: &Identity) -> bool {
        self.banned.contains(identity)
    }

    pub fn members(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.members.values()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Write one line to every member
    ///
    /// Returns the IDs of members whose write failed. Failed members are
    /// left in place; the caller decides how to evict them.
    pub fn broadcast(&self, line: &str) -> Vec<ConnectionId> {
        self.members
            .values()
            .filter(|m| m.write(line).is_err())
            .map(ConnectionHandle::id)
            .collect()
    }

    /// Resolve a kick/ban pattern to a single member identity
    ///
    /// An exact identity match wins. Otherwise the pattern is matched as a
    /// substring against the other members' identities, and must select
    /// exactly one distinct identity.
    pub fn find_target(&self, issuer: &Identity, pattern: &str) -> Result<Identity, ChatError> {
        if let Some(exact) = self.members().find(|m| m.identity().as_str() == pattern) {
            if exact.identity() == issuer {
                return Err(ChatError::SelfTarget);
            }
            return Ok(exact.identity().clone());
        }

        let matches: BTreeSet<&Identity> = self
            .members()
            .map(ConnectionHandle::identity)
            .filter(|identity| *identity != issuer && identity.as_str().contains(pattern))
            .collect();

        let mut matches = matches.into_iter();
        match (matches.next(), matches.next()) {
            (Some(identity), None) => Ok(identity.clone()),
            (None, _) => Err(ChatError::TargetNotFound(pattern.to_string())),
            (Some(_), Some(_)) => Err(ChatError::AmbiguousTarget(pattern.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn member(identity: &str) -> (ConnectionHandle, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (ConnectionHandle::new(Identity::from(identity), tx), rx)
    }

    #[test]
    fn test_room_creation() {
        let room = ChatRoom::new(RoomName::from("general"));

        assert_eq!(room.name, RoomName::from("general"));
        assert_eq!(room.member_count(), 0);
        assert!(!room.is_banned(&Identity::from("x")));
    }

    #[test]
    fn test_room_add_and_remove() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        let (alice, _rx) = member("10.0.0.1:1000");

        assert!(room.add_member(alice.clone()));
        assert!(!room.add_member(alice.clone()));
        assert!(room.contains(alice.id()));

        assert!(room.remove_member(alice.id()).is_some());
        assert!(!room.contains(alice.id()));
        assert_eq!(room.member_count(), 0);
    }

    #[tokio::test]
    async fn test_room_broadcast_reaches_every_member() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        let (alice, mut alice_rx) = member("a");
        let (bob, mut bob_rx) = member("b");
        room.add_member(alice);
        room.add_member(bob);

        let failed = room.broadcast("hello");

        assert!(failed.is_empty());
        assert_eq!(alice_rx.recv().await.as_deref(), Some("hello"));
        assert_eq!(bob_rx.recv().await.as_deref(), Some("hello"));
    }

    #[test]
    fn test_room_broadcast_reports_failed_members() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        let (alice, _alice_rx) = member("a");
        let (bob, bob_rx) = member("b");
        let bob_id = bob.id();
        room.add_member(alice);
        room.add_member(bob);
        drop(bob_rx);

        assert_eq!(room.broadcast("hello"), vec![bob_id]);
        // Broadcast never evicts on its own
        assert!(room.contains(bob_id));
    }

    #[test]
    fn test_room_ban_is_identity_keyed() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        assert!(room.ban(Identity::from("10.0.0.2")));
        assert!(!room.ban(Identity::from("10.0.0.2")));
        assert!(room.is_banned(&Identity::from("10.0.0.2")));
        assert!(!room.is_banned(&Identity::from("10.0.0.20")));
    }

    #[test]
    fn test_room_remove_identity_removes_all_sharing_it() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        let (first, _r1) = member("10.0.0.2");
        let (second, _r2) = member("10.0.0.2");
        let (other, _r3) = member("10.0.0.3");
        room.add_member(first);
        room.add_member(second);
        room.add_member(other.clone());

        let removed = room.remove_identity(&Identity::from("10.0.0.2"));

        assert_eq!(removed.len(), 2);
        assert_eq!(room.member_count(), 1);
        assert!(room.contains(other.id()));
    }

    #[test]
    fn test_find_target_exact_and_substring() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        let (alice, _r1) = member("10.0.0.1:1000");
        let (bob, _r2) = member("10.0.0.2:2000");
        room.add_member(alice.clone());
        room.add_member(bob);

        let issuer = alice.identity();
        assert_eq!(
            room.find_target(issuer, "10.0.0.2:2000"),
            Ok(Identity::from("10.0.0.2:2000"))
        );
        assert_eq!(room.find_target(issuer, ":2000"), Ok(Identity::from("10.0.0.2:2000")));
        // The issuer's own identity is skipped during substring matching
        assert_eq!(room.find_target(issuer, "10.0.0."), Ok(Identity::from("10.0.0.2:2000")));
    }

    #[test]
    fn test_find_target_errors() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        let (alice, _r1) = member("10.0.0.1:1000");
        let (bob, _r2) = member("10.0.0.2:2000");
        let (carol, _r3) = member("10.0.0.3:3000");
        room.add_member(alice.clone());
        room.add_member(bob);
        room.add_member(carol);

        let issuer = alice.identity();
        assert_eq!(
            room.find_target(issuer, "10.0.0.1:1000"),
            Err(ChatError::SelfTarget)
        );
        assert_eq!(
            room.find_target(issuer, "nobody"),
            Err(ChatError::TargetNotFound("nobody".to_string()))
        );
        assert_eq!(
            room.find_target(issuer, "10.0.0."),
            Err(ChatError::AmbiguousTarget("10.0.0.".to_string()))
        );
    }

    #[test]
    fn test_find_target_same_identity_is_not_ambiguous() {
        let mut room = ChatRoom::new(RoomName::from("general"));
        let (alice, _r1) = member("10.0.0.1");
        let (bob1, _r2) = member("10.0.0.2");
        let (bob2, _r3) = member("10.0.0.2");
        room.add_member(alice.clone());
        room.add_member(bob1);
        room.add_member(bob2);

        assert_eq!(
            room.find_target(alice.identity(), ".2"),
            Ok(Identity::from("10.0.0.2"))
        );
    }
}
