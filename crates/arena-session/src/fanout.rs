//! Broadcast fan-out: delivering one encoded frame to many connections.
//!
//! Every connection has a bounded outbound queue drained by exactly one
//! writer task, so frames reach a given client in the order they were
//! queued. Fan-out only ever `try_send`s into those queues: it runs while
//! the registry lock is held and must never wait on a slow socket.
//!
//! Delivery is at-most-once. A full or closed queue costs that one
//! recipient that one frame; the rest of the fan-out carries on.

use std::sync::Arc;

use arena_protocol::UserId;
use arena_transport::ConnectionId;
use tokio::sync::{Notify, mpsc};

use crate::{DeliveryError, PlayerSession, SessionError, SessionRegistry};

/// An encoded server frame. Shared, so a broadcast encodes once and every
/// recipient's queue holds a pointer to the same bytes.
pub type Frame = Arc<[u8]>;

/// The sending side of one connection: its outbound queue plus an
/// eviction signal for its read loop.
#[derive(Debug, Clone)]
pub struct Outbound {
    conn_id: ConnectionId,
    tx: mpsc::Sender<Frame>,
    evicted: Arc<Notify>,
}

impl Outbound {
    /// Creates the handle and the receiver the writer task drains.
    ///
    /// `capacity` is the most frames that may wait for a slow reader
    /// before further frames to it are dropped.
    pub fn channel(conn_id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let outbound = Self {
            conn_id,
            tx,
            evicted: Arc::new(Notify::new()),
        };
        (outbound, rx)
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Queues `frame` without waiting.
    pub fn try_deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
        self.tx.try_send(Arc::clone(frame)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull(self.conn_id),
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed(self.conn_id),
        })
    }

    /// Tells the connection's read loop that a newer connection took over
    /// this identity. Sticky: fires even if nobody is waiting yet.
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Resolves once [`evict`](Self::evict) has been called.
    pub async fn evicted(&self) {
        self.evicted.notified().await;
    }
}

/// Who should receive a server frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every registered connection.
    All,
    /// Every registered connection except this player's.
    AllExcept(UserId),
    /// Exactly this player's connection.
    User(UserId),
}

impl SessionRegistry {
    /// Delivers `frame` to `recipient`. Returns how many queues accepted it.
    ///
    /// A `User` recipient that is not connected is silently skipped.
    pub fn dispatch(&self, recipient: Recipient, frame: &Frame) -> usize {
        match recipient {
            Recipient::All => self.broadcast_to_all(frame),
            Recipient::AllExcept(excluded) => self.broadcast_to_others(excluded, frame),
            Recipient::User(user_id) => usize::from(self.unicast(user_id, frame).is_ok()),
        }
    }

    pub fn broadcast_to_all(&self, frame: &Frame) -> usize {
        self.sessions
            .values()
            .filter(|session| deliver(session, frame))
            .count()
    }

    pub fn broadcast_to_others(&self, excluded: UserId, frame: &Frame) -> usize {
        self.sessions
            .values()
            .filter(|session| session.user_id() != excluded)
            .filter(|session| deliver(session, frame))
            .count()
    }

    /// Queues `frame` for one player.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the player has no live session.
    /// Queue failures are logged, not returned.
    pub fn unicast(&self, user_id: UserId, frame: &Frame) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(&user_id)
            .ok_or(SessionError::NotFound(user_id))?;
        deliver(session, frame);
        Ok(())
    }
}

fn deliver(session: &PlayerSession, frame: &Frame) -> bool {
    match session.outbound.try_deliver(frame) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                user_id = %session.user_id(),
                error = %e,
                "dropping outbound frame"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use arena_protocol::JoinArena;

    use super::*;
    use crate::{Identity, SessionLimits};

    fn join(
        registry: &mut SessionRegistry,
        user: u64,
        capacity: usize,
    ) -> mpsc::Receiver<Frame> {
        let (outbound, rx) = Outbound::channel(ConnectionId::new(user * 10), capacity);
        let session = PlayerSession::new(
            Identity::new(UserId(user), format!("p{user}")),
            outbound,
            JoinArena::default(),
            &SessionLimits::default(),
        );
        registry.upsert(session);
        rx
    }

    fn frame(text: &str) -> Frame {
        Arc::from(text.as_bytes())
    }

    #[test]
    fn test_broadcast_to_others_skips_excluded_player() {
        let mut registry = SessionRegistry::new();
        let mut a = join(&mut registry, 1, 8);
        let mut b = join(&mut registry, 2, 8);
        let mut c = join(&mut registry, 3, 8);

        let delivered = registry.broadcast_to_others(UserId(1), &frame("x"));

        assert_eq!(delivered, 2);
        assert!(a.try_recv().is_err());
        assert_eq!(&*b.try_recv().unwrap(), b"x");
        assert_eq!(&*c.try_recv().unwrap(), b"x");
    }

    #[test]
    fn test_broadcast_to_all_includes_everyone() {
        let mut registry = SessionRegistry::new();
        let mut a = join(&mut registry, 1, 8);
        let mut b = join(&mut registry, 2, 8);

        assert_eq!(registry.dispatch(Recipient::All, &frame("shot")), 2);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_unicast_to_absent_player_is_not_found() {
        let mut registry = SessionRegistry::new();
        let mut a = join(&mut registry, 1, 8);

        let err = registry.unicast(UserId(99), &frame("hit")).unwrap_err();
        assert!(matches!(err, SessionError::NotFound(UserId(99))));
        assert_eq!(registry.dispatch(Recipient::User(UserId(99)), &frame("hit")), 0);
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_does_not_block_other_recipients() {
        let mut registry = SessionRegistry::new();
        let _slow = join(&mut registry, 1, 1);
        let mut fast = join(&mut registry, 2, 8);

        // First frame fills the slow queue; the second overflows it.
        assert_eq!(registry.broadcast_to_all(&frame("1")), 2);
        assert_eq!(registry.broadcast_to_all(&frame("2")), 1);

        assert_eq!(&*fast.try_recv().unwrap(), b"1");
        assert_eq!(&*fast.try_recv().unwrap(), b"2");
    }

    #[test]
    fn test_closed_queue_is_reported() {
        let (outbound, rx) = Outbound::channel(ConnectionId::new(5), 4);
        drop(rx);
        let err = outbound.try_deliver(&frame("x")).unwrap_err();
        assert!(matches!(err, DeliveryError::Closed(_)));
    }

    #[test]
    fn test_per_connection_order_is_preserved() {
        let mut registry = SessionRegistry::new();
        let mut a = join(&mut registry, 1, 16);

        for i in 0..10 {
            registry.unicast(UserId(1), &frame(&i.to_string())).unwrap();
        }
        for i in 0..10 {
            assert_eq!(&*a.try_recv().unwrap(), i.to_string().as_bytes());
        }
    }

    #[tokio::test]
    async fn test_evict_is_sticky_before_anyone_waits() {
        let (outbound, _rx) = Outbound::channel(ConnectionId::new(1), 1);
        outbound.evict();
        tokio::time::timeout(std::time::Duration::from_millis(50), outbound.evicted())
            .await
            .expect("eviction signal should already be set");
    }
}
