//! Player sessions for the arena coordinator.
//!
//! This crate owns the in-memory side of the arena:
//!
//! 1. **Authentication**: turning a token into an [`Identity`]
//!    ([`Authenticator`] trait)
//! 2. **Session state**: one [`PlayerSession`] per live player
//! 3. **Registry**: the [`SessionRegistry`] that enforces one session per
//!    identity
//! 4. **Fan-out**: delivering frames to [`Recipient`]s through each
//!    connection's [`Outbound`] queue
//!
//! # How it fits in the stack
//!
//! ```text
//! Event processor (above)  ← mutates sessions, asks for fan-out
//!     ↕
//! Session layer (this crate)  ← who is connected, what they look like
//!     ↕
//! Protocol + transport (below)  ← UserId, snapshots, ConnectionId
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod fanout;
mod registry;
mod session;

pub use auth::{Authenticator, Identity, TokenTable};
pub use error::{DeliveryError, SessionError};
pub use fanout::{Frame, Outbound, Recipient};
pub use registry::SessionRegistry;
pub use session::{ArenaRun, PlayerSession, SessionLimits, unix_millis};
