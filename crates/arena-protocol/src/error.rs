//! Error types for the protocol layer.
//!
//! When you see a `ProtocolError`, the problem is in the bytes a client
//! sent (or that we failed to produce), not in networking or session
//! state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, a wrong
    /// field type, or an unknown `type` tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded fine but is not allowed at this point of the
    /// conversation, e.g. a `player_update` before `join_arena`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Builds an [`InvalidMessage`](Self::InvalidMessage) error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidMessage(reason.into())
    }
}
