//! Error types for the chat server
//!
//! Defines command-level chat errors and fatal application errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Command-level errors
///
/// Recovered locally: the `Display` text is sent back to the issuing
/// connection as a single line and its worker keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// A room with the requested name already exists
    #[error("Error: A chat room with that name already exists.")]
    AlreadyExists,

    /// No room with the requested name
    #[error("Error: A chat room with that name does not exist.")]
    RoomNotFound,

    /// The joining identity is on the room's ban list
    #[error("Error: You are banned from chat room \"{0}\".")]
    Banned(String),

    /// The connection is not a member of any room
    #[error("Error: You are not in any chat room.")]
    NotInRoom,

    /// The connection is already a member of this room
    #[error("Error: You are already in chat room \"{0}\".")]
    AlreadyMember(String),

    /// No member identity matches the kick/ban pattern
    #[error("Error: No member matching \"{0}\" in this chat room.")]
    TargetNotFound(String),

    /// The kick/ban pattern matches more than one identity
    #[error("Error: \"{0}\" matches more than one member; be more specific.")]
    AmbiguousTarget(String),

    /// Kick/ban aimed at the issuer's own identity
    #[error("Error: You cannot kick or ban yourself.")]
    SelfTarget,

    /// Command given without its required argument
    #[error("Error: Usage: {0}")]
    MissingArgument(&'static str),

    /// The connection's outbound queue is closed
    #[error("Error: Connection write failed.")]
    TransportWrite,
}

/// Fatal application errors
///
/// Terminate the connection (or the server, during startup).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS configuration error
    #[error("TLS error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    /// Client certificate verifier could not be built
    #[error("Client verifier error: {0}")]
    Verifier(#[from] tokio_rustls::rustls::server::VerifierBuilderError),

    /// Certificate or key material missing from a PEM file
    #[error("Invalid PEM material: {0}")]
    Pem(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lines_match_protocol() {
        assert_eq!(
            ChatError::Banned("general".to_string()).to_string(),
            "Error: You are banned from chat room \"general\"."
        );
        assert_eq!(
            ChatError::NotInRoom.to_string(),
            "Error: You are not in any chat room."
        );
        assert_eq!(
            ChatError::MissingArgument("/join <room>").to_string(),
            "Error: Usage: /join <room>"
        );
    }
}
