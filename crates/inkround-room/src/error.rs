//! Error types for the room layer.
//!
//! The `Display` text of each variant is what the player sees in an
//! `ERROR` event, so it is written for humans.

use inkround_protocol::RoomId;

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or was closed).
    #[error("Room {0} not found.")]
    NotFound(RoomId),

    /// Another room already uses this name (case-insensitive).
    #[error("A room named \"{0}\" already exists.")]
    NameConflict(String),

    /// A connected player already uses this nickname.
    #[error("Nickname \"{0}\" is already taken in this room.")]
    NicknameTaken(String),

    /// Neither the password nor the room token matched.
    #[error("Incorrect room password.")]
    WrongPassword,

    /// New nicknames cannot join once the game has started.
    #[error("The game has already started.")]
    GameAlreadyStarted,

    /// A host-only action from someone else. Never sent to clients:
    /// such requests are ignored.
    #[error("Only the host can do that.")]
    NotAuthorized,

    /// Fewer than two eligible players, or someone is not ready.
    #[error("Cannot start game. Need 2+ players and all ready.")]
    CannotStart,

    /// This connection already plays under another nickname.
    #[error("You have already joined this room.")]
    AlreadyJoined,

    /// A word catalog with no usable words.
    #[error("invalid word catalog: {0}")]
    InvalidWordCatalog(String),
}
