//! Transport abstraction layer for the arena coordinator.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol. The only implementation today is WebSocket.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingUpgrade, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::time::Duration;

/// Opaque identifier for a connection.
///
/// Unique for the lifetime of the process. Two connections from the same
/// player (e.g. a page reload) always get different ids, which is what lets
/// the session registry tell a stale connection from a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// An accepted socket whose protocol handshake has not run yet.
    type Pending: Upgrade<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming socket.
    ///
    /// Returns as soon as the socket is accepted, before any bytes are
    /// exchanged. The handshake happens in [`Upgrade::upgrade`], off the
    /// accept loop.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A socket that still has to complete its protocol handshake.
///
/// A peer can stall here forever; callers bound
/// [`upgrade`](Upgrade::upgrade) with their own timeout.
pub trait Upgrade: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// The id the finished connection will carry.
    fn id(&self) -> ConnectionId;

    /// Runs the handshake. Dropping the future closes the socket.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// Reading and writing must not block each other: a task parked in
/// [`recv`](Connection::recv) must not delay a concurrent
/// [`send`](Connection::send) from the connection's writer task.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next data frame from the remote peer.
    ///
    /// Control frames (ping/pong) are consumed internally but still count
    /// as activity for [`idle_for`](Connection::idle_for).
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a keep-alive ping. The peer is expected to answer it.
    async fn ping(&self) -> Result<(), Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// How long since anything was last received from the peer.
    fn idle_for(&self) -> Duration;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
