//! Error types for the session layer.

use arena_protocol::UserId;
use arena_transport::ConnectionId;

/// Errors that can occur while admitting or looking up players.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Authentication failed: the token was missing, invalid, or rejected
    /// by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No live session exists for the given player.
    ///
    /// For unicasts this is expected (the target left) and callers drop
    /// the message silently.
    #[error("no session for player {0}")]
    NotFound(UserId),

    /// The connection already owns an active session and tried to join
    /// again without dying first.
    #[error("{0} already has an active session")]
    AlreadyJoined(ConnectionId),
}

/// A frame could not be queued for one connection.
///
/// Fan-out logs these and moves on to the next recipient.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The connection's outbound queue is full (slow reader).
    #[error("outbound queue full for {0}")]
    QueueFull(ConnectionId),

    /// The connection's writer task has already shut down.
    #[error("outbound queue closed for {0}")]
    Closed(ConnectionId),
}
