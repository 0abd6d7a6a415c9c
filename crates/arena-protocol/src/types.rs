//! Wire types for the arena protocol.
//!
//! Every frame is a JSON object with a `type` discriminant. Client frames
//! decode into [`ClientMessage`], server frames are built from
//! [`ServerMessage`]. Both are internally tagged enums
//! (`#[serde(tag = "type")]`), so a `player_update` arrives as
//!
//! ```json
//! { "type": "player_update", "x": 10.0, "y": 4.5, "score": 120, ... }
//! ```
//!
//! Field names on the wire are camelCase because the browser client
//! is written in JavaScript.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The durable identity of a player, as issued by the auth service.
///
/// Serialized as a plain number (`#[serde(transparent)]`), so
/// `UserId(42)` is just `42` in JSON.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 2D point or vector: positions, body segments, and headings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// `true` if neither component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// How a kill happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillMethod {
    Bullet,
    #[serde(alias = "body")]
    BodyCollision,
    #[serde(alias = "head")]
    HeadCollision,
}

impl fmt::Display for KillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bullet => "bullet",
            Self::BodyCollision => "body_collision",
            Self::HeadCollision => "head_collision",
        })
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// First frame on every connection (and the start of every new life).
///
/// All state fields default so that a client sending only a token still
/// gets a session; the server sanitizes whatever it receives. A missing
/// token decodes as empty and is rejected by the authenticator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinArena {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub direction: Vec2,
    #[serde(default)]
    pub segments: Vec<Vec2>,
    #[serde(default)]
    pub skin: String,
}

/// The client's self-reported state for this frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub direction: Vec2,
    #[serde(default)]
    pub segments: Vec<Vec2>,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub speed: f64,
    /// `None` keeps the current skin.
    #[serde(default)]
    pub skin: Option<String>,
}

/// A projectile fired by the sender. The bullet body is opaque to the
/// server and relayed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerShoot {
    pub bullet: serde_json::Value,
}

/// The sender's bullet struck `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletHit {
    pub target_id: UserId,
    #[serde(default)]
    pub hit_type: String,
    #[serde(default)]
    pub damage: f64,
}

/// `killer_id` killed `victim_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerKill {
    pub killer_id: UserId,
    pub victim_id: UserId,
    pub kill_method: KillMethod,
}

/// The sender died. Carries the life's totals for settlement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDeath {
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub xp_reward: u64,
    #[serde(default)]
    pub stars_from_kills: u64,
    /// Length of the life in seconds, as measured by the client.
    #[serde(default)]
    pub duration: f64,
}

/// Every frame a client may send.
///
/// Matching on this enum is exhaustive, so adding a message kind forces
/// every dispatcher to decide what to do with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinArena(JoinArena),
    PlayerUpdate(PlayerUpdate),
    PlayerShoot(PlayerShoot),
    BulletHit(BulletHit),
    #[serde(alias = "player_killed")]
    PlayerKill(PlayerKill),
    PlayerDeath(PlayerDeath),
}

impl ClientMessage {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinArena(_) => "join_arena",
            Self::PlayerUpdate(_) => "player_update",
            Self::PlayerShoot(_) => "player_shoot",
            Self::BulletHit(_) => "bullet_hit",
            Self::PlayerKill(_) => "player_kill",
            Self::PlayerDeath(_) => "player_death",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// The public view of one live player, as other clients see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: UserId,
    pub username: String,
    pub x: f64,
    pub y: f64,
    pub direction: Vec2,
    pub segments: Vec<Vec2>,
    pub score: u64,
    pub kills: u32,
    pub speed: f64,
    pub skin: String,
    pub hue: u16,
}

/// Every frame the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full roster, sent to a player right after they join. Includes the
    /// player themselves.
    ArenaState {
        you: UserId,
        players: Vec<PlayerSnapshot>,
    },

    /// Someone else entered the arena.
    PlayerJoined { player: PlayerSnapshot },

    /// Fresh state for one or more players.
    PlayersUpdate { players: Vec<PlayerSnapshot> },

    /// Relayed shot, stamped with the shooter.
    #[serde(rename_all = "camelCase")]
    PlayerShoot {
        player_id: UserId,
        bullet: serde_json::Value,
    },

    /// You were hit.
    #[serde(rename_all = "camelCase")]
    BulletReceived {
        shooter_id: UserId,
        hit_type: String,
        damage: f64,
    },

    /// A kill was recorded.
    #[serde(rename_all = "camelCase")]
    PlayerKilled {
        killer_id: UserId,
        victim_id: UserId,
        kill_method: KillMethod,
        killer_kills: u32,
    },

    /// A player left the arena (death or disconnect).
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: UserId },

    Error { message: String },
}

impl ServerMessage {
    /// Shorthand for an [`Error`](Self::Error) frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! The browser client parses these exact JSON shapes, so the tests
    //! pin the serde attributes rather than round-tripping every variant.

    use super::*;
    use serde_json::json;

    fn snapshot(id: u64) -> PlayerSnapshot {
        PlayerSnapshot {
            id: UserId(id),
            username: format!("player{id}"),
            x: 1.0,
            y: 2.0,
            direction: Vec2::new(1.0, 0.0),
            segments: vec![Vec2::new(0.0, 2.0)],
            score: 10,
            kills: 0,
            speed: 3.0,
            skin: "classic".into(),
            hue: 200,
        }
    }

    #[test]
    fn test_user_id_is_plain_number_on_the_wire() {
        assert_eq!(serde_json::to_string(&UserId(42)).unwrap(), "42");
        assert_eq!(UserId(7).to_string(), "U-7");
    }

    #[test]
    fn test_join_arena_decodes_with_camel_case_fields() {
        let raw = json!({
            "type": "join_arena",
            "token": "abc",
            "x": 5.0,
            "y": -3.5,
            "direction": {"x": 0.0, "y": 1.0},
            "segments": [{"x": 5.0, "y": -4.5}],
            "skin": "neon"
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();
        let ClientMessage::JoinArena(join) = msg else {
            panic!("expected join_arena");
        };
        assert_eq!(join.token, "abc");
        assert_eq!(join.direction, Vec2::new(0.0, 1.0));
        assert_eq!(join.segments.len(), 1);
        assert_eq!(join.skin, "neon");
    }

    #[test]
    fn test_join_arena_without_token_decodes_empty() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join_arena","x":1,"y":2}"#).unwrap();
        let ClientMessage::JoinArena(join) = msg else {
            panic!("expected join_arena");
        };
        assert!(join.token.is_empty());
        assert!(join.segments.is_empty());
    }

    #[test]
    fn test_bullet_hit_uses_camel_case_target() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"bullet_hit","targetId":9,"hitType":"head","damage":25}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::BulletHit(BulletHit {
                target_id: UserId(9),
                hit_type: "head".into(),
                damage: 25.0,
            })
        );
    }

    #[test]
    fn test_player_killed_tag_is_accepted_as_player_kill() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"player_killed","killerId":1,"victimId":2,"killMethod":"body"}"#,
        )
        .unwrap();
        let ClientMessage::PlayerKill(kill) = msg else {
            panic!("expected player_kill");
        };
        assert_eq!(kill.kill_method, KillMethod::BodyCollision);
        assert_eq!(kill.killer_id, UserId(1));
    }

    #[test]
    fn test_player_death_fields_default_to_zero() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"player_death","xpReward":50}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlayerDeath(PlayerDeath {
                xp_reward: 50,
                ..PlayerDeath::default()
            })
        );
    }

    #[test]
    fn test_unknown_client_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"fly_to_moon","speed":9000}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_type_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"x":1,"y":2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_arena_state_json_shape() {
        let msg = ServerMessage::ArenaState {
            you: UserId(1),
            players: vec![snapshot(1), snapshot(2)],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "arena_state");
        assert_eq!(json["you"], 1);
        assert_eq!(json["players"].as_array().unwrap().len(), 2);
        assert_eq!(json["players"][0]["username"], "player1");
        assert_eq!(json["players"][0]["direction"], json!({"x": 1.0, "y": 0.0}));
    }

    #[test]
    fn test_struct_variants_use_camel_case_fields() {
        let json = serde_json::to_value(ServerMessage::PlayerKilled {
            killer_id: UserId(1),
            victim_id: UserId(2),
            kill_method: KillMethod::HeadCollision,
            killer_kills: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "player_killed");
        assert_eq!(json["killerId"], 1);
        assert_eq!(json["victimId"], 2);
        assert_eq!(json["killMethod"], "head_collision");
        assert_eq!(json["killerKills"], 3);

        let json = serde_json::to_value(ServerMessage::BulletReceived {
            shooter_id: UserId(4),
            hit_type: "body".into(),
            damage: 10.0,
        })
        .unwrap();
        assert_eq!(json["type"], "bullet_received");
        assert_eq!(json["shooterId"], 4);
        assert_eq!(json["hitType"], "body");
    }

    #[test]
    fn test_player_shoot_relays_bullet_verbatim() {
        let bullet = json!({"x": 1, "y": 2, "angle": 0.5, "owner": "client-side"});
        let json = serde_json::to_value(ServerMessage::PlayerShoot {
            player_id: UserId(3),
            bullet: bullet.clone(),
        })
        .unwrap();
        assert_eq!(json["playerId"], 3);
        assert_eq!(json["bullet"], bullet);
    }

    #[test]
    fn test_error_frame_shape() {
        let json = serde_json::to_value(ServerMessage::error("unauthorized")).unwrap();
        assert_eq!(json, json!({"type": "error", "message": "unauthorized"}));
    }

    #[test]
    fn test_vec2_is_finite() {
        assert!(Vec2::new(1.0, 2.0).is_finite());
        assert!(!Vec2::new(f64::NAN, 2.0).is_finite());
        assert!(!Vec2::new(1.0, f64::INFINITY).is_finite());
    }
}
