//! A player in a room's roster.

use inkround_protocol::{ConnectionId, PlayerSummary};

/// One nickname's record in a room.
///
/// The nickname is the stable identity: a reconnect swaps the connection
/// id and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub nickname: String,
    pub connection_id: ConnectionId,
    pub is_host: bool,
    pub connected: bool,
    pub is_ready: bool,
    /// Committed score; only changes when a turn ends.
    pub score: u32,
    pub color: String,
    /// Join order within the room; lower joined earlier.
    pub(crate) joined_seq: u64,
}

impl Player {
    pub(crate) fn new(
        nickname: &str,
        connection_id: ConnectionId,
        is_host: bool,
        color: &str,
        joined_seq: u64,
    ) -> Self {
        Self {
            nickname: nickname.to_string(),
            connection_id,
            is_host,
            connected: true,
            is_ready: false,
            score: 0,
            color: color.to_string(),
            joined_seq,
        }
    }

    /// Whether this player draws and guesses under `host_plays`.
    ///
    /// Only a spectating host is ineligible; connectivity is checked by
    /// callers.
    pub fn plays(&self, host_plays: bool) -> bool {
        !(self.is_host && !host_plays)
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            nickname: self.nickname.clone(),
            is_host: self.is_host,
            is_ready: self.is_ready,
            connected: self.connected,
            color: self.color.clone(),
            score: self.score,
        }
    }
}
