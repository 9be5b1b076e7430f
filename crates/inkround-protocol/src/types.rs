//! Identity and addressing types shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque short identifier of a room, e.g. `"3fa9c01b"`.
///
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Client-chosen identifier of one live connection inside a room.
///
/// Clients put it in the socket URL (`/ws/{room_id}/{connection_id}`).
/// It changes on every reconnect; the player's nickname is the stable
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a message?
// ---------------------------------------------------------------------------

/// Addressing for an outbound event within one room.
///
/// Room operations return `(Recipient, ServerEvent)` pairs and the
/// connection directory resolves them against the room's live handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every live connection registered for the room.
    All,

    /// Every live connection except the given one (e.g. the stroke's author).
    AllExcept(ConnectionId),

    /// Exactly one connection.
    Connection(ConnectionId),
}
