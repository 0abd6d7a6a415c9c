//! Read-only view of who is in the arena.

use std::sync::Arc;

use arena_protocol::PlayerSnapshot;
use arena_session::SessionRegistry;
use tokio::sync::Mutex;

/// Roster queries for dashboards, health checks, and the periodic roster
/// log. Cheap to clone; every clone sees the live registry.
#[derive(Clone)]
pub struct ArenaMonitor {
    registry: Arc<Mutex<SessionRegistry>>,
}

impl ArenaMonitor {
    pub(crate) fn new(registry: Arc<Mutex<SessionRegistry>>) -> Self {
        Self { registry }
    }

    /// Number of players currently in the arena.
    pub async fn roster_size(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Point-in-time copy of every live player, sorted by user id.
    pub async fn roster(&self) -> Vec<PlayerSnapshot> {
        self.registry.lock().await.snapshot()
    }
}

impl std::fmt::Debug for ArenaMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaMonitor").finish_non_exhaustive()
    }
}
