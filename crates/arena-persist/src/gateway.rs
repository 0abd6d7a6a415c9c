//! The persistence gateway: where durable writes actually go.
//!
//! The relational store and its schema live outside this repository. The
//! arena only needs three independent writes, so it defines the
//! [`PersistenceGateway`] trait and lets the deployment plug in the real
//! store. [`LogGateway`] just logs each record, which is what a
//! development server runs with.

use crate::{KillEvent, PersistError, RewardCredit, RunRecord};

/// Durable writes for arena results.
///
/// Each method is independent: a failure in one says nothing about the
/// others, and callers never retry. Implementations are assumed to be
/// eventually consistent.
pub trait PersistenceGateway: Send + Sync + 'static {
    /// Stores one finished life.
    fn record_run_session(
        &self,
        run: &RunRecord,
    ) -> impl std::future::Future<Output = Result<(), PersistError>> + Send;

    /// Appends one kill to the kill log.
    fn record_kill(
        &self,
        kill: &KillEvent,
    ) -> impl std::future::Future<Output = Result<(), PersistError>> + Send;

    /// Adds xp and stars to the player's balance.
    fn credit_rewards(
        &self,
        credit: &RewardCredit,
    ) -> impl std::future::Future<Output = Result<(), PersistError>> + Send;
}

/// A [`PersistenceGateway`] that writes every record to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogGateway;

impl PersistenceGateway for LogGateway {
    async fn record_run_session(&self, run: &RunRecord) -> Result<(), PersistError> {
        tracing::info!(
            user_id = %run.user_id,
            xp = run.xp_earned,
            kills = run.kills,
            duration_secs = run.duration_secs,
            "run session recorded"
        );
        Ok(())
    }

    async fn record_kill(&self, kill: &KillEvent) -> Result<(), PersistError> {
        tracing::info!(
            killer = %kill.killer_id,
            victim = %kill.victim_id,
            method = %kill.method,
            "kill recorded"
        );
        Ok(())
    }

    async fn credit_rewards(&self, credit: &RewardCredit) -> Result<(), PersistError> {
        tracing::info!(
            user_id = %credit.user_id,
            xp = credit.xp,
            stars = credit.stars,
            "rewards credited"
        );
        Ok(())
    }
}
