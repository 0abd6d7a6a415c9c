//! Unified error type for the arena coordinator.

use arena_persist::PersistError;
use arena_protocol::ProtocolError;
use arena_session::SessionError;
use arena_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `arena` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, unknown player, double join).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A durable write failed.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The configuration could not be read or makes no sense.
    #[error("invalid configuration: {0}")]
    Config(String),
}
