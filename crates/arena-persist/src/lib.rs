//! Best-effort persistence for the arena coordinator.
//!
//! Three things outlive a life in the arena: the run record, each kill,
//! and the reward credit. This crate defines
//!
//! - the records themselves ([`RunRecord`], [`KillEvent`],
//!   [`RewardCredit`]),
//! - the [`PersistenceGateway`] trait the real store implements, and
//! - [`PersistQueue`], the fire-and-forget queue that keeps storage latency
//!   out of the network path.
//!
//! Durability is best-effort: failures are logged, never retried, and never
//! roll back in-memory state.

#![allow(async_fn_in_trait)]

mod error;
mod gateway;
mod queue;
mod records;

pub use error::PersistError;
pub use gateway::{LogGateway, PersistenceGateway};
pub use queue::{PersistConfig, PersistQueue};
pub use records::{KillEvent, PersistJob, RewardCredit, RunRecord};
