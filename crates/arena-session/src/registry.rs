//! The session registry: every live player in the arena.
//!
//! This is the single source of truth for who is connected. It is
//! responsible for:
//! - Enforcing one active session per identity (newest connection wins)
//! - Finding a session by player (for unicasts) or by connection (for the
//!   sender of an inbound frame)
//! - Producing point-in-time snapshots of the roster
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself: it uses plain
//! `HashMap`s. The server owns it behind one `tokio::sync::Mutex` and does
//! each mutation plus its fan-out inside a single critical section, which
//! is what serializes concurrent joins for the same identity.

use std::collections::HashMap;

use arena_protocol::{PlayerSnapshot, UserId};
use arena_transport::ConnectionId;

use crate::PlayerSession;

/// All live player sessions.
///
/// ## Lifecycle
///
/// ```text
/// join_arena ──→ upsert() ──→ player_death / close ──→ remove()
///                   │
///                   └─ same identity already present?
///                      evict the old connection, keep the new one
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Live sessions, keyed by identity.
    pub(crate) sessions: HashMap<UserId, PlayerSession>,

    /// Which identity each connection is bound to. Kept in sync with
    /// `sessions`; an evicted connection has no entry here.
    connections: HashMap<ConnectionId, UserId>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `session`, replacing any session for the same identity.
    ///
    /// If the identity was bound to a different connection, that
    /// connection is told to shut down via its eviction signal. The
    /// replaced session is returned so the caller can see what happened.
    pub fn upsert(&mut self, session: PlayerSession) -> Option<PlayerSession> {
        let user_id = session.user_id();
        let conn_id = session.conn_id();

        let replaced = self.sessions.remove(&user_id);
        if let Some(old) = &replaced {
            self.connections.remove(&old.conn_id());
            if old.conn_id() != conn_id {
                old.outbound.evict();
                tracing::info!(
                    %user_id,
                    stale = %old.conn_id(),
                    current = %conn_id,
                    "evicted stale session"
                );
            }
        }

        // A connection owns at most one identity.
        if let Some(previous) = self.connections.insert(conn_id, user_id) {
            if previous != user_id {
                self.sessions.remove(&previous);
            }
        }
        self.sessions.insert(user_id, session);

        tracing::info!(%user_id, %conn_id, players = self.sessions.len(), "session registered");
        replaced
    }

    /// Removes the session bound to `conn_id`.
    ///
    /// Returns `None` if the connection has no session, including when it
    /// was evicted by a newer connection; the newer session is untouched.
    pub fn remove(&mut self, conn_id: ConnectionId) -> Option<PlayerSession> {
        let user_id = self.connections.remove(&conn_id)?;
        let session = self.sessions.remove(&user_id);
        if session.is_some() {
            tracing::info!(%user_id, %conn_id, players = self.sessions.len(), "session removed");
        }
        session
    }

    /// Looks up a session by identity.
    pub fn lookup(&self, user_id: UserId) -> Option<&PlayerSession> {
        self.sessions.get(&user_id)
    }

    pub fn lookup_mut(&mut self, user_id: UserId) -> Option<&mut PlayerSession> {
        self.sessions.get_mut(&user_id)
    }

    /// Looks up the session a connection is bound to.
    pub fn by_connection(&self, conn_id: ConnectionId) -> Option<&PlayerSession> {
        let user_id = self.connections.get(&conn_id)?;
        self.sessions.get(user_id)
    }

    pub fn by_connection_mut(&mut self, conn_id: ConnectionId) -> Option<&mut PlayerSession> {
        let user_id = self.connections.get(&conn_id)?;
        self.sessions.get_mut(user_id)
    }

    /// A point-in-time copy of every session, ordered by user id.
    pub fn snapshot(&self) -> Vec<PlayerSnapshot> {
        let mut players: Vec<_> = self.sessions.values().map(PlayerSession::snapshot).collect();
        players.sort_by_key(|p| p.id);
        players
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
