//! Error types for the session layer.

use inkround_protocol::{ConnectionId, RoomId};

/// Errors that can occur while delivering to connections.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live handle is registered under this id.
    #[error("connection {connection_id} is not registered in room {room_id}")]
    UnknownConnection {
        room_id: RoomId,
        connection_id: ConnectionId,
    },

    /// The socket task behind the handle is gone. The handle has been
    /// dropped from the directory.
    #[error("send to connection {0} failed")]
    SendFailed(ConnectionId),
}
