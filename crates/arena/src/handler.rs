//! Per-connection handler: upgrade, handshake, read loop, heartbeat,
//! teardown.
//!
//! The WebSocket upgrade runs here rather than in the accept loop, bounded
//! by the handshake timeout. After it, each connection has two Tokio tasks:
//!   - the writer, which drains the connection's outbound queue into the
//!     socket and closes it once every sender is gone;
//!   - the reader (this function), which owns the connection's phase and
//!     turns inbound frames into event-processor calls.
//!
//! Phases:
//! ```text
//! (handshake) ──join_arena──▶ Active ──player_death──▶ Removed
//!                               ▲                          │
//!                               └────────join_arena────────┘
//! ```
//! The read loop ends on transport close, idle timeout, or eviction. All
//! three fall through to the same teardown.

use std::sync::Arc;
use std::time::Duration;

use arena_protocol::{ClientMessage, Codec};
use arena_session::{Authenticator, Frame, Outbound};
use arena_transport::{
    Connection, ConnectionId, PendingUpgrade, TransportError, Upgrade, WebSocketConnection,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::events::Step;
use crate::gateway::{admit, await_join, send_error};
use crate::server::ServerState;
use crate::ArenaError;

/// How long teardown waits for queued frames to reach a slow client.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on one heartbeat ping. Pings share the send half with the
/// writer, so a ping can queue behind a send to a slow client.
const PING_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    Removed,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    pending: PendingUpgrade,
    state: Arc<ServerState<A, C>>,
) -> Result<(), ArenaError>
where
    A: Authenticator,
    C: Codec,
{
    let conn_id = pending.id();
    let peer = pending.peer_addr();
    let conn = match tokio::time::timeout(state.config.handshake_timeout(), pending.upgrade()).await {
        Ok(upgraded) => Arc::new(upgraded?),
        Err(_) => {
            tracing::debug!(%conn_id, %peer, "WebSocket upgrade timed out");
            return Err(TransportError::HandshakeTimedOut.into());
        }
    };
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let (outbound, rx) = Outbound::channel(conn_id, state.config.outbound_queue_capacity);
    let mut writer = tokio::spawn(write_loop(Arc::clone(&conn), rx));

    let result = serve(&conn, &outbound, &state).await;

    // Unbind first so no new fan-out targets this connection, then let the
    // writer flush whatever is queued and close the socket.
    if let Err(e) = state.events.disconnect(conn_id).await {
        tracing::warn!(%conn_id, error = %e, "teardown broadcast failed");
    }
    drop(outbound);
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut writer).await.is_err() {
        tracing::debug!(%conn_id, "writer did not drain in time, aborting");
        writer.abort();
        let _ = conn.close().await;
    }

    tracing::debug!(%conn_id, "connection closed");
    result
}

async fn serve<A, C>(
    conn: &WebSocketConnection,
    outbound: &Outbound,
    state: &ServerState<A, C>,
) -> Result<(), ArenaError>
where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    let codec = state.events.codec();

    let join = await_join(conn, outbound, codec, state.config.handshake_timeout()).await?;
    admit(conn_id, outbound, state, join).await?;
    let mut phase = Phase::Active;

    let period = state.config.heartbeat_interval();
    let ping_timeout = period.min(PING_TIMEOUT);
    let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = outbound.evicted() => {
                tracing::info!(%conn_id, "connection superseded by a newer login");
                return Ok(());
            }

            _ = heartbeat.tick() => {
                let idle = conn.idle_for();
                if idle > state.config.idle_timeout() {
                    tracing::info!(%conn_id, idle_ms = idle.as_millis() as u64, "idle timeout");
                    return Ok(());
                }
                heartbeat_ping(conn, ping_timeout).await?;
            }

            frame = conn.recv() => {
                let Some(data) = frame? else {
                    tracing::debug!(%conn_id, "client closed connection");
                    return Ok(());
                };
                let msg: ClientMessage = match codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "undecodable frame");
                        send_error(outbound, codec, &e.to_string());
                        continue;
                    }
                };
                phase = on_message(conn_id, outbound, state, phase, msg).await?;
            }
        }
    }
}

async fn on_message<A, C>(
    conn_id: ConnectionId,
    outbound: &Outbound,
    state: &ServerState<A, C>,
    phase: Phase,
    msg: ClientMessage,
) -> Result<Phase, ArenaError>
where
    A: Authenticator,
    C: Codec,
{
    match (phase, msg) {
        (Phase::Removed, ClientMessage::JoinArena(join)) => {
            admit(conn_id, outbound, state, join).await?;
            Ok(Phase::Active)
        }
        (Phase::Removed, other) => {
            tracing::debug!(%conn_id, kind = other.kind(), "ignoring message after death");
            Ok(Phase::Removed)
        }
        (Phase::Active, msg) => {
            let kind = msg.kind();
            match state.events.apply(conn_id, msg).await {
                Ok(Step::Continue) => Ok(Phase::Active),
                Ok(Step::Died) => Ok(Phase::Removed),
                Err(e) => {
                    tracing::debug!(%conn_id, kind, error = %e, "message rejected");
                    send_error(outbound, state.events.codec(), &e.to_string());
                    Ok(Phase::Active)
                }
            }
        }
    }
}

/// Sends one keep-alive ping, giving up after `limit`.
///
/// A ping stuck behind a slow send is skipped; the idle check on the next
/// tick still reaps a peer that has gone quiet.
async fn heartbeat_ping<T: Connection>(conn: &T, limit: Duration) -> Result<(), T::Error> {
    match tokio::time::timeout(limit, conn.ping()).await {
        Ok(sent) => sent,
        Err(_) => {
            tracing::debug!(conn_id = %conn.id(), "ping stalled behind a pending send, skipped");
            Ok(())
        }
    }
}

/// Drains the outbound queue into the socket, in order, then closes it.
async fn write_loop(conn: Arc<WebSocketConnection>, mut rx: mpsc::Receiver<Frame>) {
    let conn_id = conn.id();
    while let Some(frame) = rx.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}
