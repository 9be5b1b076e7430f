//! Unified error type for Inkround.

use inkround_protocol::ProtocolError;
use inkround_room::RoomError;
use inkround_session::SessionError;
use inkround_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum InkroundError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A delivery error from the connection directory.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A game-rule or catalog error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Reading a file the server was pointed at.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A setting that could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
