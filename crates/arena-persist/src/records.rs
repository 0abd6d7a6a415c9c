//! What gets written when a life ends or a kill happens.

use arena_protocol::{KillMethod, PlayerDeath, UserId};
use arena_session::{ArenaRun, unix_millis};
use serde::Serialize;

/// One finished life in the arena.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub user_id: UserId,
    pub xp_earned: u64,
    pub kills: u32,
    pub deaths: u32,
    pub duration_secs: f64,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
}

impl RunRecord {
    /// Closes out `run` with the totals the client reported at death.
    ///
    /// The client's duration is used when it is a sane number; otherwise
    /// the server's own measurement of the life stands in.
    pub fn settle(user_id: UserId, run: &ArenaRun, death: &PlayerDeath) -> Self {
        let duration_secs = if death.duration.is_finite() && death.duration >= 0.0 {
            death.duration
        } else {
            run.elapsed().as_secs_f64()
        };
        Self {
            user_id,
            xp_earned: death.xp,
            kills: death.kills,
            deaths: 1,
            duration_secs,
            started_at_ms: run.started_at_ms(),
            ended_at_ms: unix_millis(),
        }
    }
}

/// An append-only record of one kill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KillEvent {
    pub killer_id: UserId,
    pub victim_id: UserId,
    pub method: KillMethod,
    /// Killer's score at the moment of the kill.
    pub killer_xp: u64,
    /// Victim's score at the moment of the kill.
    pub victim_xp: u64,
    pub at_ms: u64,
}

/// Balance credit earned by one life.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardCredit {
    pub user_id: UserId,
    pub xp: u64,
    pub stars: u64,
}

impl RewardCredit {
    pub fn from_death(user_id: UserId, death: &PlayerDeath) -> Self {
        Self {
            user_id,
            xp: death.xp_reward,
            stars: death.stars_from_kills,
        }
    }
}

/// A unit of work for the persistence queue.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistJob {
    RunSession(RunRecord),
    Kill(KillEvent),
    Rewards(RewardCredit),
}

impl PersistJob {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunSession(_) => "run_session",
            Self::Kill(_) => "kill",
            Self::Rewards(_) => "rewards",
        }
    }

    /// The player the write is about (the killer, for kills).
    pub fn user_id(&self) -> UserId {
        match self {
            Self::RunSession(r) => r.user_id,
            Self::Kill(k) => k.killer_id,
            Self::Rewards(r) => r.user_id,
        }
    }
}
