//! Per-connection handler: path routing, writer task and message loop.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The flow is:
//!   1. Parse `/ws/{room_id}/{connection_id}` from the request path
//!   2. Register an outbound channel with the engine (unknown room → close)
//!   3. Spawn a writer task draining that channel into the socket
//!   4. Loop: receive frames → decode → hand to the engine

use std::sync::Arc;

use inkround_protocol::{ClientMessage, Codec, ConnectionId, ProtocolError, RoomId};
use inkround_session::{Outbound, OutboundReceiver, OutboundSender, outbound_channel};
use inkround_transport::{Connection, WebSocketConnection};

use crate::InkroundError;
use crate::server::ServerState;

/// Splits `/ws/{room_id}/{connection_id}` into its ids.
pub(crate) fn parse_ws_path(path: &str) -> Option<(RoomId, ConnectionId)> {
    let rest = path.strip_prefix("/ws/")?;
    let (room, conn) = rest.trim_end_matches('/').split_once('/')?;
    if room.is_empty() || conn.is_empty() || conn.contains('/') {
        return None;
    }
    Some((RoomId::from(room), ConnectionId::from(conn)))
}

/// Drop guard that tells the engine a socket is gone when the handler
/// exits.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the async
/// lock is taken in a fire-and-forget task.
struct ConnectionGuard<C: Codec> {
    room_id: RoomId,
    connection_id: ConnectionId,
    sender: OutboundSender,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let room_id = self.room_id.clone();
        let connection_id = self.connection_id.clone();
        let sender = self.sender.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut engine = state.engine.lock().await;
            engine.disconnect(&room_id, &connection_id, &sender);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), InkroundError> {
    let socket_id = conn.id();
    let Some((room_id, connection_id)) = parse_ws_path(conn.path()) else {
        tracing::debug!(%socket_id, path = conn.path(), "unroutable path, closing");
        conn.close().await?;
        return Ok(());
    };

    let (sender, outbound) = outbound_channel();
    let accepted = state
        .engine
        .lock()
        .await
        .connect(&room_id, &connection_id, sender.clone());
    if !accepted {
        tracing::info!(%room_id, %connection_id, "connection to unknown room closed");
        conn.close().await?;
        return Ok(());
    }
    let _guard = ConnectionGuard {
        room_id: room_id.clone(),
        connection_id: connection_id.clone(),
        sender,
        state: Arc::clone(&state),
    };
    tracing::debug!(%socket_id, %room_id, %connection_id, "connection registered");

    let conn = Arc::new(conn);
    let mut writer = tokio::spawn(write_loop(Arc::clone(&conn), outbound, Arc::clone(&state)));

    loop {
        let data = tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::debug!(%room_id, %connection_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%room_id, %connection_id, error = %e, "recv error");
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!(%room_id, %connection_id, "writer finished");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%room_id, %connection_id, error = %e, "malformed frame dropped");
                continue;
            }
        };
        state.engine.lock().await.handle(&room_id, &connection_id, msg);
    }

    writer.abort();
    // _guard drops here → engine.disconnect fires.
    Ok(())
}

/// Drains the outbound channel into the socket until it is closed, a
/// write fails, or the engine asks for a close.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: OutboundReceiver,
    state: Arc<ServerState<C>>,
) -> Result<(), InkroundError> {
    while let Some(out) = outbound.recv().await {
        match out {
            Outbound::Event(event) => {
                let bytes = state.codec.encode(&event)?;
                let text = String::from_utf8(bytes)
                    .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
                conn.send(&text).await?;
            }
            Outbound::Close => {
                conn.close().await?;
                break;
            }
        }
    }
    Ok(())
}
