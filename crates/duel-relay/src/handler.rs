//! Per-connection session: receive, classify, dispatch, clean up.
//!
//! Each accepted connection gets two Tokio tasks:
//!   1. the session loop (this module), parked on `recv` between frames;
//!   2. a writer draining the connection's outbound queue into the socket.
//!
//! The room manager and the echo loop only ever push into the queue, so
//! nothing outside a connection's own tasks waits on its socket.

use std::sync::Arc;
use std::time::Duration;

use duel_relay_protocol::{Codec, Message};
use duel_relay_room::{PlayerSender, RoomError};
use duel_relay_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};
use tokio::sync::mpsc;

use crate::config::RelayMode;
use crate::server::ServerState;
use crate::RelayError;

/// How long a finished session waits for its writer to flush.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RelayError>
where
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, mode = %state.config.mode, "session started");

    let (outbound, queue) = mpsc::channel(state.config.outbound_capacity);
    let mut writer = tokio::spawn(write_outbound(Arc::clone(&conn), queue));

    match state.config.mode {
        RelayMode::Rooms => run_session(&conn, &state, outbound).await,
        RelayMode::Echo => run_echo(&conn, outbound).await,
    }

    // Every sender is gone once the session has left its room, so the
    // writer flushes what is queued and stops.
    match tokio::time::timeout(FLUSH_TIMEOUT, &mut writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(%conn_id, error = %e, "writer task failed");
        }
        Err(_) => {
            tracing::debug!(%conn_id, "peer not reading, abandoning flush");
            writer.abort();
        }
    }

    match conn.close().await {
        Ok(()) | Err(TransportError::ConnectionClosed(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// The room session loop. Returns once the connection is finished and has
/// been taken out of its room.
///
/// Which room the connection is in lives only in the room manager, so a
/// refused join needs no local bookkeeping.
async fn run_session<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    outbound: PlayerSender,
) {
    let conn_id = conn.id();

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::info!(%conn_id, error = %e, "connection lost");
                break;
            }
        };

        let msg: Message = match state.codec.decode(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::info!(
                    %conn_id, error = %e, "malformed frame, dropping connection"
                );
                break;
            }
        };

        if msg.is_join() {
            join(state, conn_id, &outbound, &msg.room).await;
        } else {
            let delivered = state.rooms.broadcast(conn_id, &frame).await;
            tracing::trace!(%conn_id, kind = %msg.kind, delivered, "relayed");
        }
    }

    let outcome = state.rooms.leave(conn_id).await;
    tracing::debug!(%conn_id, ?outcome, "session closed");
}

/// Asks the room manager to seat this connection. A refused join leaves
/// the connection where it was; the manager has already told the client.
async fn join<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    outbound: &PlayerSender,
    room: &str,
) {
    match state.rooms.join(conn_id, outbound.clone(), room).await {
        Ok(outcome) => {
            tracing::debug!(%conn_id, room, ?outcome, "join accepted");
        }
        Err(RoomError::RoomFull(_)) => {}
        Err(e) => {
            tracing::warn!(%conn_id, room, error = %e, "join failed");
        }
    }
}

/// Sends every frame straight back. No decoding, no rooms.
async fn run_echo(conn: &WebSocketConnection, outbound: PlayerSender) {
    let conn_id = conn.id();
    loop {
        match conn.recv().await {
            Ok(Some(frame)) => {
                if outbound.send(frame).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "echo recv failed");
                break;
            }
        }
    }
    tracing::debug!(%conn_id, "echo session closed");
}

/// Drains a connection's outbound queue into its socket.
async fn write_outbound(
    conn: Arc<WebSocketConnection>,
    mut queue: mpsc::Receiver<Vec<u8>>,
) {
    while let Some(frame) = queue.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed");
            break;
        }
    }
}
