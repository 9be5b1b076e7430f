//! # Inkround
//!
//! Server-side session engine for a real-time drawing and word-guessing
//! game: one player draws, the others race to guess the word in chat.
//!
//! The [`Engine`] owns every room, live connection and round timer; the
//! [`InkroundServer`] puts it behind a WebSocket listener at
//! `/ws/{room_id}/{connection_id}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inkround::prelude::*;
//!
//! # async fn run() -> Result<(), InkroundError> {
//! let server = InkroundServer::builder().bind("0.0.0.0:8000").build().await?;
//! server
//!     .engine()
//!     .lock()
//!     .await
//!     .create_room("Doodles", None, GameType::Drawing, None)?;
//! server.run().await
//! # }
//! ```

mod engine;
mod error;
mod handler;
mod server;

pub use engine::Engine;
pub use error::InkroundError;
pub use server::{InkroundServer, InkroundServerBuilder, ServerConfig, SharedEngine};

/// Everything needed to embed a server.
pub mod prelude {
    pub use crate::{Engine, InkroundError, InkroundServer, InkroundServerBuilder, ServerConfig};
    pub use inkround_protocol::{
        ClientMessage, ConfigPatch, GameConfig, GameType, RoomId, ServerEvent,
    };
    pub use inkround_room::{RegistryConfig, RoomError, WordCatalog};
}
