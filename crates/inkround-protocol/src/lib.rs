//! Wire protocol for Inkround.
//!
//! This crate defines the "language" that browsers and the server speak:
//!
//! - **Messages** ([`ClientMessage`], [`ServerEvent`]): the `{type, payload}`
//!   frames that travel on the wire.
//! - **Game types** ([`GameConfig`], [`GameStateView`], [`Stroke`], ...):
//!   the payload building blocks.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames are converted
//!   to and from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! engine. It knows nothing about connections or game rules.
//!
//! ```text
//! Transport (text frames) → Protocol (ClientMessage) → Room (game rules)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod config;
mod error;
mod game;
mod messages;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use config::{ConfigPatch, GameConfig, GameType, RoomStatus, TurnOrder};
pub use error::ProtocolError;
pub use game::{GameStateView, Phase, PlayerSummary, RoomListing, Stroke, TurnResult};
pub use messages::{ClientMessage, DEFAULT_NICKNAME, ServerEvent, WireFrame};
pub use types::{ConnectionId, Recipient, RoomId};
