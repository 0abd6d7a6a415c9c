//! Connection gateway: the `join_arena` handshake.
//!
//! A new connection must open with `join_arena` within the handshake
//! timeout. Anything else (silence, garbage, another message type) ends the
//! connection before a session ever exists. The same admission path runs
//! again when a player who died on this connection joins for a new life.

use std::time::Duration;

use arena_protocol::{ClientMessage, Codec, JoinArena, ProtocolError, ServerMessage};
use arena_session::{Authenticator, Frame, Outbound};
use arena_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};

use crate::ArenaError;
use crate::server::ServerState;

/// Error text sent to clients whose token does not verify.
pub(crate) const UNAUTHORIZED: &str = "unauthorized";

/// Waits for the connection's first frame and insists it is `join_arena`.
///
/// Protocol failures are reported to the client with an error frame
/// before returning; a timeout or a closed socket just returns.
pub(crate) async fn await_join<C: Codec>(
    conn: &WebSocketConnection,
    outbound: &Outbound,
    codec: &C,
    timeout: Duration,
) -> Result<JoinArena, ArenaError> {
    let data = match tokio::time::timeout(timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(TransportError::ConnectionClosed("closed before join".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(ProtocolError::invalid("join timed out").into()),
    };

    let err = match codec.decode::<ClientMessage>(&data) {
        Ok(ClientMessage::JoinArena(join)) => return Ok(join),
        Ok(other) => ProtocolError::invalid(format!(
            "first message must be join_arena, got {}",
            other.kind()
        )),
        Err(e) => e,
    };
    send_error(outbound, codec, &err.to_string());
    Err(err.into())
}

/// Verifies the join token and registers the player.
///
/// A bad token gets an `unauthorized` error frame and no session.
pub(crate) async fn admit<A: Authenticator, C: Codec>(
    conn_id: ConnectionId,
    outbound: &Outbound,
    state: &ServerState<A, C>,
    join: JoinArena,
) -> Result<(), ArenaError> {
    let identity = match state.auth.verify(&join.token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "join rejected");
            send_error(outbound, state.events.codec(), UNAUTHORIZED);
            return Err(e.into());
        }
    };

    tracing::info!(
        %conn_id,
        user_id = %identity.user_id,
        username = %identity.username,
        "player joined"
    );
    state.events.join(identity, outbound.clone(), join).await
}

/// Queues an `error` frame for this connection only.
pub(crate) fn send_error<C: Codec>(outbound: &Outbound, codec: &C, message: &str) {
    let frame = match codec.encode(&ServerMessage::error(message)) {
        Ok(bytes) => Frame::from(bytes),
        Err(e) => {
            tracing::warn!(conn_id = %outbound.conn_id(), error = %e, "failed to encode error frame");
            return;
        }
    };
    if let Err(e) = outbound.try_deliver(&frame) {
        tracing::warn!(error = %e, "dropping error frame");
    }
}
