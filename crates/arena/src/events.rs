//! The event processor: what each client message does to the arena.
//!
//! Every handler follows the same shape. Take the registry lock, mutate,
//! encode the resulting server message once, fan it out with non-blocking
//! sends, release the lock. Nothing inside the critical section awaits
//! anything but the lock itself, so one slow client or a slow database
//! never holds up the others.
//!
//! Persistence jobs are handed to the [`PersistQueue`] and forgotten. A
//! failed write never rolls back what already happened in memory.

use std::sync::Arc;

use arena_persist::{KillEvent, PersistJob, PersistQueue, RewardCredit, RunRecord};
use arena_protocol::{
    BulletHit, ClientMessage, Codec, JoinArena, PlayerDeath, PlayerKill, PlayerShoot,
    PlayerUpdate, ServerMessage, UserId,
};
use arena_session::{
    Frame, Identity, Outbound, PlayerSession, Recipient, SessionError, SessionLimits,
    SessionRegistry, unix_millis,
};
use arena_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::ArenaError;

/// What the connection should do after a message was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep going; the player is still in the arena.
    Continue,
    /// The player died. The connection stays open but has no session
    /// until it joins again.
    Died,
}

/// Applies client messages to the shared registry.
///
/// One processor is shared by every connection task.
pub struct EventProcessor<C: Codec> {
    registry: Arc<Mutex<SessionRegistry>>,
    persist: PersistQueue,
    codec: C,
    limits: SessionLimits,
}

impl<C: Codec> EventProcessor<C> {
    pub fn new(
        registry: Arc<Mutex<SessionRegistry>>,
        persist: PersistQueue,
        codec: C,
        limits: SessionLimits,
    ) -> Self {
        Self {
            registry,
            persist,
            codec,
            limits,
        }
    }

    pub fn registry(&self) -> &Arc<Mutex<SessionRegistry>> {
        &self.registry
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn frame(&self, msg: &ServerMessage) -> Result<Frame, ArenaError> {
        Ok(Frame::from(self.codec.encode(msg)?))
    }

    /// Registers a freshly verified player.
    ///
    /// Any older connection for the same identity is evicted. The newcomer
    /// receives the whole roster, itself included; everyone else hears
    /// `player_joined`.
    pub async fn join(
        &self,
        identity: Identity,
        outbound: Outbound,
        join: JoinArena,
    ) -> Result<(), ArenaError> {
        let session = PlayerSession::new(identity, outbound, join, &self.limits);
        let user_id = session.user_id();
        let joined = self.frame(&ServerMessage::PlayerJoined {
            player: session.snapshot(),
        })?;

        let mut registry = self.registry.lock().await;
        // The evicted session (if any) is dropped here; its connection
        // notices through its eviction signal.
        drop(registry.upsert(session));

        let state = self.frame(&ServerMessage::ArenaState {
            you: user_id,
            players: registry.snapshot(),
        })?;
        registry.dispatch(Recipient::User(user_id), &state);
        let notified = registry.dispatch(Recipient::AllExcept(user_id), &joined);

        tracing::debug!(%user_id, notified, "join broadcast");
        Ok(())
    }

    /// Applies one steady-state message from the connection `conn_id`.
    ///
    /// # Errors
    /// `join_arena` while the connection is alive is refused with
    /// [`SessionError::AlreadyJoined`]; encode failures surface as
    /// protocol errors. Neither changes any state.
    pub async fn apply(&self, conn_id: ConnectionId, msg: ClientMessage) -> Result<Step, ArenaError> {
        match msg {
            ClientMessage::JoinArena(_) => Err(SessionError::AlreadyJoined(conn_id).into()),
            ClientMessage::PlayerUpdate(update) => self.update(conn_id, update).await,
            ClientMessage::PlayerShoot(shoot) => self.shoot(conn_id, shoot).await,
            ClientMessage::BulletHit(hit) => self.bullet_hit(conn_id, hit).await,
            ClientMessage::PlayerKill(kill) => self.kill(conn_id, kill).await,
            ClientMessage::PlayerDeath(death) => self.death(conn_id, death).await,
        }
    }

    async fn update(&self, conn_id: ConnectionId, update: PlayerUpdate) -> Result<Step, ArenaError> {
        let mut registry = self.registry.lock().await;
        let Some(session) = registry.by_connection_mut(conn_id) else {
            tracing::debug!(%conn_id, "update from connection without a session");
            return Ok(Step::Continue);
        };
        session.apply_update(update, &self.limits);
        let user_id = session.user_id();
        let frame = self.frame(&ServerMessage::PlayersUpdate {
            players: vec![session.snapshot()],
        })?;
        registry.dispatch(Recipient::AllExcept(user_id), &frame);
        Ok(Step::Continue)
    }

    async fn shoot(&self, conn_id: ConnectionId, shoot: PlayerShoot) -> Result<Step, ArenaError> {
        let registry = self.registry.lock().await;
        let Some(shooter) = registry.by_connection(conn_id).map(PlayerSession::user_id) else {
            tracing::debug!(%conn_id, "shot from connection without a session");
            return Ok(Step::Continue);
        };
        let frame = self.frame(&ServerMessage::PlayerShoot {
            player_id: shooter,
            bullet: shoot.bullet,
        })?;
        registry.dispatch(Recipient::All, &frame);
        Ok(Step::Continue)
    }

    async fn bullet_hit(&self, conn_id: ConnectionId, hit: BulletHit) -> Result<Step, ArenaError> {
        let registry = self.registry.lock().await;
        let Some(shooter) = registry.by_connection(conn_id).map(PlayerSession::user_id) else {
            tracing::debug!(%conn_id, "hit from connection without a session");
            return Ok(Step::Continue);
        };
        let target = hit.target_id;
        if registry.lookup(target).is_none() {
            tracing::debug!(%shooter, %target, "hit target not in arena, dropped");
            return Ok(Step::Continue);
        }
        let frame = self.frame(&ServerMessage::BulletReceived {
            shooter_id: shooter,
            hit_type: hit.hit_type,
            damage: hit.damage,
        })?;
        registry.dispatch(Recipient::User(target), &frame);
        Ok(Step::Continue)
    }

    async fn kill(&self, conn_id: ConnectionId, kill: PlayerKill) -> Result<Step, ArenaError> {
        let mut registry = self.registry.lock().await;
        if registry.by_connection(conn_id).is_none() {
            tracing::debug!(%conn_id, "kill report from connection without a session");
            return Ok(Step::Continue);
        }

        let killer_kills = match registry.lookup_mut(kill.killer_id) {
            Some(killer) => {
                killer.kills += 1;
                killer.kills
            }
            None => 0,
        };
        let score_of = |id: UserId| registry.lookup(id).map_or(0, |s| s.score);
        let event = KillEvent {
            killer_id: kill.killer_id,
            victim_id: kill.victim_id,
            method: kill.kill_method,
            killer_xp: score_of(kill.killer_id),
            victim_xp: score_of(kill.victim_id),
            at_ms: unix_millis(),
        };
        self.persist.submit(PersistJob::Kill(event));

        let frame = self.frame(&ServerMessage::PlayerKilled {
            killer_id: kill.killer_id,
            victim_id: kill.victim_id,
            kill_method: kill.kill_method,
            killer_kills,
        })?;
        registry.dispatch(Recipient::All, &frame);

        tracing::info!(
            killer = %kill.killer_id,
            victim = %kill.victim_id,
            method = %kill.kill_method,
            killer_kills,
            "kill"
        );
        Ok(Step::Continue)
    }

    async fn death(&self, conn_id: ConnectionId, death: PlayerDeath) -> Result<Step, ArenaError> {
        let mut registry = self.registry.lock().await;
        let Some(session) = registry.remove(conn_id) else {
            tracing::debug!(%conn_id, "death from connection without a session");
            return Ok(Step::Died);
        };
        let user_id = session.user_id();

        self.persist.submit(PersistJob::RunSession(RunRecord::settle(
            user_id,
            &session.run,
            &death,
        )));
        self.persist.submit(PersistJob::Rewards(RewardCredit::from_death(user_id, &death)));

        let frame = self.frame(&ServerMessage::PlayerLeft { player_id: user_id })?;
        registry.dispatch(Recipient::All, &frame);

        tracing::info!(
            %user_id,
            xp = death.xp,
            kills = death.kills,
            players = registry.len(),
            "player died"
        );
        Ok(Step::Died)
    }

    /// Tears down whatever session `conn_id` still owns.
    ///
    /// Without a death report there is nothing to settle, so no run record
    /// or reward credit is written. A connection that was evicted or already
    /// died owns nothing and this is a no-op.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), ArenaError> {
        let mut registry = self.registry.lock().await;
        let Some(session) = registry.remove(conn_id) else {
            return Ok(());
        };
        let user_id = session.user_id();
        let frame = self.frame(&ServerMessage::PlayerLeft { player_id: user_id })?;
        registry.dispatch(Recipient::All, &frame);

        tracing::info!(%user_id, %conn_id, "player left without dying, run forfeited");
        Ok(())
    }
}
