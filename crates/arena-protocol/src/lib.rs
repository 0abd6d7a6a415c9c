//! Wire protocol for the arena coordinator.
//!
//! This crate defines the "language" that browser clients and the server
//! speak:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`PlayerSnapshot`],
//!   etc.): the JSON frames that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those frames are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong along the way.
//!
//! The protocol layer doesn't know about connections or sessions; it only
//! knows how to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Session (player state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    BulletHit, ClientMessage, JoinArena, KillMethod, PlayerDeath, PlayerKill,
    PlayerShoot, PlayerSnapshot, PlayerUpdate, ServerMessage, UserId, Vec2,
};
