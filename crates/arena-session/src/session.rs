//! Session types: the server's authoritative record of one live player.
//!
//! A [`PlayerSession`] exists from a successful `join_arena` until the
//! player dies or their connection goes away. It tracks:
//! - WHO the player is ([`Identity`])
//! - WHERE to send their frames ([`Outbound`])
//! - WHAT they last reported (position, body, score, ...)
//! - WHEN this life started ([`ArenaRun`]), for settlement at death
//!
//! Clients self-report their state, so everything they send goes through
//! [`SessionLimits`] before it is stored or relayed.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use arena_protocol::{JoinArena, PlayerSnapshot, PlayerUpdate, UserId, Vec2};
use arena_transport::ConnectionId;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Identity, Outbound};

// ---------------------------------------------------------------------------
// SessionLimits
// ---------------------------------------------------------------------------

/// Sanity bounds applied to client-reported state.
///
/// These are not game rules; they only keep a buggy or hostile client from
/// pushing NaNs or megabyte-sized bodies through the fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Longest body accepted; extra segments are cut off the tail.
    pub max_segments: usize,
    /// Coordinates are clamped to `[-max_coordinate, max_coordinate]`.
    pub max_coordinate: f64,
    /// Speeds are clamped to `[0, max_speed]`.
    pub max_speed: f64,
    /// Skin ids longer than this (in bytes) are truncated.
    pub max_skin_len: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_segments: 512,
            max_coordinate: 1_000_000.0,
            max_speed: 10_000.0,
            max_skin_len: 64,
        }
    }
}

impl SessionLimits {
    fn coordinate(&self, v: f64) -> f64 {
        if v.is_finite() {
            v.clamp(-self.max_coordinate, self.max_coordinate)
        } else {
            0.0
        }
    }

    /// Clamps a position; NaN or infinite components become `0.0`.
    pub fn position(&self, x: f64, y: f64) -> Vec2 {
        Vec2::new(self.coordinate(x), self.coordinate(y))
    }

    /// Heading; falls back to `(1, 0)` when unusable.
    pub fn direction(&self, v: Vec2) -> Vec2 {
        if v.is_finite() && (v.x != 0.0 || v.y != 0.0) {
            v
        } else {
            Vec2::new(1.0, 0.0)
        }
    }

    /// Drops non-finite points, clamps the rest, caps the length.
    pub fn segments(&self, segments: Vec<Vec2>) -> Vec<Vec2> {
        segments
            .into_iter()
            .filter(Vec2::is_finite)
            .map(|p| self.position(p.x, p.y))
            .take(self.max_segments)
            .collect()
    }

    pub fn speed(&self, v: f64) -> f64 {
        if v.is_finite() && v > 0.0 {
            v.min(self.max_speed)
        } else {
            0.0
        }
    }

    pub fn skin(&self, mut skin: String) -> String {
        if skin.len() > self.max_skin_len {
            let mut end = self.max_skin_len;
            while !skin.is_char_boundary(end) {
                end -= 1;
            }
            skin.truncate(end);
        }
        skin
    }
}

// ---------------------------------------------------------------------------
// ArenaRun
// ---------------------------------------------------------------------------

/// Per-life accounting, started when the player joins.
///
/// Only the start is tracked here; the totals come from the client's
/// `player_death` and are combined into a run record at settlement.
#[derive(Debug, Clone)]
pub struct ArenaRun {
    started: Instant,
    started_at_ms: u64,
}

impl ArenaRun {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at_ms: unix_millis(),
        }
    }

    /// Wall-clock start of the life, in unix milliseconds.
    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    /// Server-measured length of the life so far.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Current wall-clock time in unix milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// PlayerSession
// ---------------------------------------------------------------------------

/// One connected player's live state.
///
/// Owned by the [`SessionRegistry`](crate::SessionRegistry); the event
/// processor mutates it only while holding the registry lock.
#[derive(Debug)]
pub struct PlayerSession {
    pub identity: Identity,
    pub outbound: Outbound,
    pub position: Vec2,
    pub direction: Vec2,
    /// Body points, head first.
    pub segments: Vec<Vec2>,
    pub score: u64,
    /// Kills credited by the server during this life.
    pub kills: u32,
    pub speed: f64,
    pub skin: String,
    /// Color hue in degrees, `0..360`, picked at join.
    pub hue: u16,
    pub last_update: Instant,
    pub run: ArenaRun,
}

impl PlayerSession {
    /// Builds the initial session from a verified identity and the
    /// client's join payload.
    pub fn new(
        identity: Identity,
        outbound: Outbound,
        join: JoinArena,
        limits: &SessionLimits,
    ) -> Self {
        Self {
            identity,
            outbound,
            position: limits.position(join.x, join.y),
            direction: limits.direction(join.direction),
            segments: limits.segments(join.segments),
            score: 0,
            kills: 0,
            speed: 0.0,
            skin: limits.skin(join.skin),
            hue: rand::rng().random_range(0..360),
            last_update: Instant::now(),
            run: ArenaRun::start(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.outbound.conn_id()
    }

    /// Overwrites the self-reported state with a `player_update`.
    pub fn apply_update(&mut self, update: PlayerUpdate, limits: &SessionLimits) {
        self.position = limits.position(update.x, update.y);
        self.direction = limits.direction(update.direction);
        self.segments = limits.segments(update.segments);
        self.score = update.score;
        self.speed = limits.speed(update.speed);
        if let Some(skin) = update.skin {
            self.skin = limits.skin(skin);
        }
        self.last_update = Instant::now();
    }

    /// The public view other clients receive.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.identity.user_id,
            username: self.identity.username.clone(),
            x: self.position.x,
            y: self.position.y,
            direction: self.direction,
            segments: self.segments.clone(),
            score: self.score,
            kills: self.kills,
            speed: self.speed,
            skin: self.skin.clone(),
            hue: self.hue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(join: JoinArena) -> PlayerSession {
        let (outbound, _rx) = Outbound::channel(ConnectionId::new(1), 4);
        PlayerSession::new(
            Identity::new(UserId(1), "ana"),
            outbound,
            join,
            &SessionLimits::default(),
        )
    }

    #[test]
    fn test_new_session_copies_join_state() {
        let s = session(JoinArena {
            token: "t".into(),
            x: 10.0,
            y: -5.0,
            direction: Vec2::new(0.0, 1.0),
            segments: vec![Vec2::new(10.0, -6.0), Vec2::new(10.0, -7.0)],
            skin: "neon".into(),
        });
        assert_eq!(s.position, Vec2::new(10.0, -5.0));
        assert_eq!(s.direction, Vec2::new(0.0, 1.0));
        assert_eq!(s.segments.len(), 2);
        assert_eq!(s.skin, "neon");
        assert_eq!(s.kills, 0);
        assert!(s.hue < 360);
    }

    #[test]
    fn test_new_session_sanitizes_nan_and_zero_direction() {
        let s = session(JoinArena {
            x: f64::NAN,
            y: f64::INFINITY,
            direction: Vec2::new(0.0, 0.0),
            segments: vec![Vec2::new(f64::NAN, 1.0), Vec2::new(2.0, 3.0)],
            ..JoinArena::default()
        });
        assert_eq!(s.position, Vec2::new(0.0, 0.0));
        assert_eq!(s.direction, Vec2::new(1.0, 0.0));
        assert_eq!(s.segments, vec![Vec2::new(2.0, 3.0)]);
    }

    #[test]
    fn test_segments_are_capped() {
        let limits = SessionLimits {
            max_segments: 3,
            ..SessionLimits::default()
        };
        let body = (0..100).map(|i| Vec2::new(i as f64, 0.0)).collect();
        let capped = limits.segments(body);
        assert_eq!(capped.len(), 3);
        assert_eq!(capped[0], Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_coordinates_and_speed_are_clamped() {
        let limits = SessionLimits {
            max_coordinate: 100.0,
            max_speed: 5.0,
            ..SessionLimits::default()
        };
        assert_eq!(limits.position(1e9, -1e9), Vec2::new(100.0, -100.0));
        assert_eq!(limits.speed(50.0), 5.0);
        assert_eq!(limits.speed(-1.0), 0.0);
        assert_eq!(limits.speed(f64::NAN), 0.0);
    }

    #[test]
    fn test_skin_truncates_on_char_boundary() {
        let limits = SessionLimits {
            max_skin_len: 4,
            ..SessionLimits::default()
        };
        // 'é' is two bytes; byte 4 falls inside the second one.
        assert_eq!(limits.skin("aéé".into()), "aé");
        assert_eq!(limits.skin("abc".into()), "abc");
    }

    #[test]
    fn test_apply_update_overwrites_state_and_keeps_skin_when_absent() {
        let mut s = session(JoinArena {
            skin: "neon".into(),
            ..JoinArena::default()
        });
        s.kills = 2;
        s.apply_update(
            PlayerUpdate {
                x: 3.0,
                y: 4.0,
                direction: Vec2::new(0.0, -1.0),
                segments: vec![Vec2::new(3.0, 5.0)],
                score: 99,
                speed: 2.5,
                skin: None,
            },
            &SessionLimits::default(),
        );
        assert_eq!(s.position, Vec2::new(3.0, 4.0));
        assert_eq!(s.score, 99);
        assert_eq!(s.speed, 2.5);
        assert_eq!(s.skin, "neon");
        // Kills are server-credited, never client-reported.
        assert_eq!(s.kills, 2);
    }

    #[test]
    fn test_snapshot_reflects_session() {
        let s = session(JoinArena::default());
        let snap = s.snapshot();
        assert_eq!(snap.id, UserId(1));
        assert_eq!(snap.username, "ana");
        assert_eq!(snap.hue, s.hue);
    }
}
