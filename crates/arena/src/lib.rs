//! # Arena
//!
//! Real-time coordinator for a multiplayer snake arena.
//!
//! Clients connect over WebSocket, join with a token, and then stream their
//! own state and combat events. The server keeps one authoritative session
//! per player and relays what each client says to the right subset of the
//! others. It settles results with durable storage when a life ends.
//!
//! The server does not simulate the game. Positions, scores, and hits are
//! self-reported; the server only bounds them, relays them, and records
//! the outcomes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arena::prelude::*;
//!
//! # async fn start() -> Result<(), ArenaError> {
//! let config = ArenaConfig::load(std::path::Path::new("arena.toml"))?;
//! let server = ArenaServerBuilder::new()
//!     .config(config.clone())
//!     .build(config.auth.token_table(), LogGateway)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod events;
mod gateway;
mod handler;
mod monitor;
mod server;

pub use config::{ArenaConfig, AuthConfig, LoggingConfig, TokenEntry};
pub use error::ArenaError;
pub use events::{EventProcessor, Step};
pub use monitor::ArenaMonitor;
pub use server::{ArenaServer, ArenaServerBuilder};

/// Everything needed to embed the arena in a binary.
pub mod prelude {
    pub use crate::{ArenaConfig, ArenaError, ArenaMonitor, ArenaServer, ArenaServerBuilder};

    pub use arena_persist::{LogGateway, PersistConfig, PersistError, PersistenceGateway};
    pub use arena_protocol::{ClientMessage, KillMethod, PlayerSnapshot, ServerMessage, UserId};
    pub use arena_session::{Authenticator, Identity, SessionError, SessionLimits, TokenTable};
}
