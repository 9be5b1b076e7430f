//! Inkround server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address with two rooms ready
//! INKROUND_ROOMS="Doodles,Sketchpad" inkround-server
//!
//! # Custom address, sweep interval and word list
//! INKROUND_ADDR=0.0.0.0:8000 INKROUND_SWEEP_SECS=30 \
//!     INKROUND_WORDS=words.json RUST_LOG=debug inkround-server
//! ```

use inkround::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), InkroundError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig::from_env()?;
    let mut builder = InkroundServer::builder().config(config);
    if let Ok(path) = std::env::var("INKROUND_WORDS") {
        let json = std::fs::read_to_string(&path)?;
        builder = builder.words(WordCatalog::from_json(&json)?);
        tracing::info!(%path, "word catalog loaded");
    }

    let server = builder.build().await?;
    tracing::info!("Server listening on {}", server.local_addr()?);

    if let Ok(names) = std::env::var("INKROUND_ROOMS") {
        let engine = server.engine();
        let mut engine = engine.lock().await;
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let room_id = engine.create_room(name, None, GameType::Drawing, None)?;
            tracing::info!(%room_id, %name, "room ready");
        }
    }

    server.run().await
}
