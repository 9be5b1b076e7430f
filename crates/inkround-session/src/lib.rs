//! Connection bookkeeping and credentials for Inkround.
//!
//! This crate handles who is reachable and who may get in:
//!
//! 1. **Delivery**: the [`ConnectionDirectory`] maps each room's live
//!    connection ids to the outbound channel of their socket task.
//! 2. **Credentials**: room passwords are stored hashed
//!    ([`Credentials`] trait, [`Sha256Credentials`]).
//! 3. **Tokens**: random room ids and rejoin tokens.
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)  ← resolves Recipients, sends ServerEvents
//!     ↕
//! Session Layer (this crate)  ← live handles, hashed secrets
//!     ↕
//! Protocol Layer (below)  ← RoomId, ConnectionId, ServerEvent
//! ```

mod credentials;
mod directory;
mod error;
mod token;

pub use credentials::{Credentials, Sha256Credentials};
pub use directory::{ConnectionDirectory, Outbound, OutboundReceiver, OutboundSender, outbound_channel};
pub use error::SessionError;
pub use token::{generate_room_id, generate_token};
