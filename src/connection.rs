//! Connection handle definition
//!
//! Represents one connected client's outbound channel and identity.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::error::ChatError;
use crate::types::{ConnectionId, Identity};

/// Handle to a connected client
///
/// Cheap to clone. Lines written here are queued for the connection's
/// writer task; the registry never touches the socket directly.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    identity: Identity,
    /// Server → client line queue
    sender: mpsc::Sender<String>,
}

impl ConnectionHandle {
    /// Create a new handle with a freshly allocated ID
    pub fn new(identity: Identity, sender: mpsc::Sender<String>) -> Self {
        Self {
            id: ConnectionId::next(),
            identity,
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Queue one line for this connection
    ///
    /// Never waits. A full queue drops this one line; only a closed queue
    /// (writer task gone after a socket error or write timeout) fails.
    pub fn write(&self, line: impl Into<String>) -> Result<(), ChatError> {
        match self.sender.try_send(line.into()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for {} {}, line dropped", self.id, self.identity);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(ChatError::TransportWrite),
        }
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl std::hash::Hash for ConnectionHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
