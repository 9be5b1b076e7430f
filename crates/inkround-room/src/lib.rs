//! Rooms and game rules for Inkround.
//!
//! Rooms are plain state machines: every operation takes `now`, mutates
//! the room and returns an [`Outbox`] of addressed events plus an optional
//! [`TimerCommand`]. Nothing here touches sockets or spawns tasks, so the
//! whole game can be driven synchronously in tests.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates, lists, admits to and reaps rooms
//! - [`Room`]: roster, config, turn machine, scoring and canvas
//! - [`GameState`]: per-game state, rendered per viewer
//! - [`WordCatalog`]: secret words by language and difficulty
//! - [`Outbox`]: what an operation wants delivered

mod config;
mod error;
mod game_state;
mod outbox;
mod palette;
mod player;
mod registry;
mod room;
mod scoring;
mod strokes;
mod turn;
mod words;

pub use config::RegistryConfig;
pub use error::RoomError;
pub use game_state::GameState;
pub use outbox::{Outbox, TimerCommand};
pub use palette::{COLORS, DEFAULT_COLOR, SYSTEM_COLOR};
pub use player::Player;
pub use registry::RoomRegistry;
pub use room::{JoinOutcome, Room};
pub use scoring::{MASKED_GUESS, SYSTEM_SENDER, drawer_points, guesser_points, is_correct_guess, time_taken};
pub use strokes::StrokeLedger;
pub use words::{WordCatalog, obfuscate};
