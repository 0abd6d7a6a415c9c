//! Bounded background queue in front of the persistence gateway.
//!
//! Connection tasks hand jobs to [`PersistQueue::submit`], which never
//! waits: a slow database must not stall anyone's read loop. One worker
//! task drains the queue and keeps up to `concurrency` gateway calls in
//! flight, so a run record and a reward credit for the same death proceed
//! independently and either may fail alone.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{PersistJob, PersistenceGateway};

/// Queue sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Jobs that may wait for the worker. Beyond this, jobs are dropped.
    pub queue_capacity: usize,
    /// Gateway calls in flight at once.
    pub concurrency: usize,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            concurrency: 8,
        }
    }
}

/// Handle for submitting persistence jobs. Cheap to clone.
///
/// The worker stops once every handle has been dropped and the queue is
/// drained.
#[derive(Debug, Clone)]
pub struct PersistQueue {
    tx: mpsc::Sender<PersistJob>,
}

impl PersistQueue {
    /// Starts the worker task for `gateway` and returns the submit handle.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn spawn<G: PersistenceGateway>(gateway: G, config: &PersistConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(run_worker(Arc::new(gateway), rx, config.concurrency.max(1)));
        Self { tx }
    }

    /// Enqueues `job` without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, job: PersistJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(
                    kind = job.kind(),
                    user_id = %job.user_id(),
                    "persistence queue full, dropping job"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(
                    kind = job.kind(),
                    user_id = %job.user_id(),
                    "persistence worker gone, dropping job"
                );
                false
            }
        }
    }
}

async fn run_worker<G: PersistenceGateway>(
    gateway: Arc<G>,
    rx: mpsc::Receiver<PersistJob>,
    concurrency: usize,
) {
    tracing::debug!(concurrency, "persistence worker started");

    let jobs = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|job| (job, rx))
    });
    jobs.for_each_concurrent(concurrency, |job| execute(gateway.as_ref(), job))
        .await;

    tracing::debug!("persistence worker stopped");
}

async fn execute<G: PersistenceGateway>(gateway: &G, job: PersistJob) {
    let result = match &job {
        PersistJob::RunSession(run) => gateway.record_run_session(run).await,
        PersistJob::Kill(kill) => gateway.record_kill(kill).await,
        PersistJob::Rewards(credit) => gateway.credit_rewards(credit).await,
    };
    match result {
        Ok(()) => tracing::debug!(kind = job.kind(), user_id = %job.user_id(), "persisted"),
        Err(e) => tracing::warn!(
            kind = job.kind(),
            user_id = %job.user_id(),
            error = %e,
            "persistence call failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use arena_protocol::{KillMethod, UserId};
    use tokio::sync::Semaphore;

    use super::*;
    use crate::{KillEvent, PersistError, RewardCredit, RunRecord};

    /// Reports every call on a channel. Optionally fails run records, and
    /// optionally parks each call until a permit is released.
    struct ScriptedGateway {
        calls: mpsc::UnboundedSender<&'static str>,
        fail_runs: bool,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedGateway {
        async fn call(&self, kind: &'static str) {
            let _ = self.calls.send(kind);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await;
            }
        }
    }

    impl PersistenceGateway for ScriptedGateway {
        async fn record_run_session(&self, _run: &RunRecord) -> Result<(), PersistError> {
            self.call("run_session").await;
            if self.fail_runs {
                return Err(PersistError::Unavailable("db down".into()));
            }
            Ok(())
        }

        async fn record_kill(&self, _kill: &KillEvent) -> Result<(), PersistError> {
            self.call("kill").await;
            Ok(())
        }

        async fn credit_rewards(&self, _credit: &RewardCredit) -> Result<(), PersistError> {
            self.call("rewards").await;
            Ok(())
        }
    }

    fn run_job() -> PersistJob {
        PersistJob::RunSession(RunRecord {
            user_id: UserId(1),
            xp_earned: 10,
            kills: 1,
            deaths: 1,
            duration_secs: 5.0,
            started_at_ms: 0,
            ended_at_ms: 5000,
        })
    }

    fn rewards_job() -> PersistJob {
        PersistJob::Rewards(RewardCredit {
            user_id: UserId(1),
            xp: 1,
            stars: 1,
        })
    }

    fn kill_job() -> PersistJob {
        PersistJob::Kill(KillEvent {
            killer_id: UserId(1),
            victim_id: UserId(2),
            method: KillMethod::Bullet,
            killer_xp: 0,
            victim_xp: 0,
            at_ms: 0,
        })
    }

    async fn next_call(rx: &mut mpsc::UnboundedReceiver<&'static str>) -> &'static str {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("gateway call within a second")
            .expect("gateway alive")
    }

    #[tokio::test]
    async fn test_failed_run_record_does_not_stop_reward_credit() {
        let (calls, mut rx) = mpsc::unbounded_channel();
        let queue = PersistQueue::spawn(
            ScriptedGateway {
                calls,
                fail_runs: true,
                gate: None,
            },
            &PersistConfig::default(),
        );

        assert!(queue.submit(run_job()));
        assert!(queue.submit(rewards_job()));

        let mut seen = vec![next_call(&mut rx).await, next_call(&mut rx).await];
        seen.sort();
        assert_eq!(seen, vec!["rewards", "run_session"]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_job_without_waiting() {
        let (calls, mut rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let queue = PersistQueue::spawn(
            ScriptedGateway {
                calls,
                fail_runs: false,
                gate: Some(Arc::clone(&gate)),
            },
            &PersistConfig {
                queue_capacity: 1,
                concurrency: 1,
            },
        );

        // The worker picks up the first job and parks inside the gateway.
        assert!(queue.submit(kill_job()));
        assert_eq!(next_call(&mut rx).await, "kill");

        // One job fits in the queue; the next one is dropped.
        assert!(queue.submit(kill_job()));
        assert!(!queue.submit(kill_job()));

        gate.add_permits(10);
        assert_eq!(next_call(&mut rx).await, "kill");
        assert!(
            tokio::time::timeout(Duration::from_millis(100), rx.recv())
                .await
                .is_err(),
            "the dropped job must never run"
        );
    }

    #[tokio::test]
    async fn test_calls_run_concurrently() {
        let (calls, mut rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let queue = PersistQueue::spawn(
            ScriptedGateway {
                calls,
                fail_runs: false,
                gate: Some(Arc::clone(&gate)),
            },
            &PersistConfig {
                queue_capacity: 8,
                concurrency: 2,
            },
        );

        queue.submit(run_job());
        queue.submit(rewards_job());

        // Both calls start even though neither has finished.
        let mut seen = vec![next_call(&mut rx).await, next_call(&mut rx).await];
        seen.sort();
        assert_eq!(seen, vec!["rewards", "run_session"]);
        gate.add_permits(2);
    }

    #[tokio::test]
    async fn test_log_gateway_accepts_everything() {
        let gateway = crate::LogGateway;
        let PersistJob::Kill(kill) = kill_job() else {
            unreachable!()
        };
        assert!(gateway.record_kill(&kill).await.is_ok());
    }
}
