//! `InkroundServer` builder and server loop.
//!
//! This is the entry point for running an Inkround game server. It ties
//! together all the layers: transport → protocol → engine (rooms,
//! connection directory, timers).

use std::sync::Arc;
use std::time::Duration;

use inkround_protocol::{Codec, JsonCodec};
use inkround_room::{RegistryConfig, RoomRegistry, WordCatalog};
use inkround_timer::FiredReceiver;
use inkround_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{Engine, InkroundError};

/// The engine as shared between connection tasks and background tasks.
pub type SharedEngine = Arc<Mutex<Engine>>;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) engine: SharedEngine,
    pub(crate) codec: C,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// How often empty rooms are reaped; `None` leaves it to the caller.
    pub sweep_interval: Option<Duration>,
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            sweep_interval: Some(Duration::from_secs(60)),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `INKROUND_ADDR` and `INKROUND_SWEEP_SECS`
    /// (`0` disables the sweep).
    ///
    /// # Errors
    /// [`InkroundError::Config`] if `INKROUND_SWEEP_SECS` is not a number.
    pub fn from_env() -> Result<Self, InkroundError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, InkroundError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("INKROUND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(secs) = lookup("INKROUND_SWEEP_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                InkroundError::Config(format!("INKROUND_SWEEP_SECS must be a number, got {secs:?}"))
            })?;
            config.sweep_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting an Inkround server.
///
/// # Example
///
/// ```rust,no_run
/// use inkround::InkroundServer;
///
/// # async fn run() -> Result<(), inkround::InkroundError> {
/// let server = InkroundServer::builder()
///     .bind("0.0.0.0:8000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InkroundServerBuilder {
    config: ServerConfig,
    words: Option<WordCatalog>,
}

impl InkroundServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the empty-room sweep interval; `None` disables the sweep task.
    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// How long a room may sit empty before the sweep removes it.
    pub fn empty_room_grace(mut self, grace: Duration) -> Self {
        self.config.registry.empty_room_grace = grace;
        self
    }

    /// Replaces the built-in word catalog.
    pub fn words(mut self, words: WordCatalog) -> Self {
        self.words = Some(words);
        self
    }

    /// Binds the listener and assembles the engine.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<InkroundServer<JsonCodec>, InkroundError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let mut registry = RoomRegistry::new(self.config.registry.clone());
        if let Some(words) = self.words {
            registry = registry.with_words(words);
        }
        let (engine, fired) = Engine::new(registry);

        let state = Arc::new(ServerState {
            engine: Arc::new(Mutex::new(engine)),
            codec: JsonCodec,
        });

        Ok(InkroundServer {
            transport,
            state,
            fired,
            sweep_interval: self.config.sweep_interval,
        })
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound Inkround server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct InkroundServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    fired: FiredReceiver,
    sweep_interval: Option<Duration>,
}

impl InkroundServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> InkroundServerBuilder {
        InkroundServerBuilder::new()
    }
}

impl<C: Codec> InkroundServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The engine, for room creation and listing from outside the
    /// socket protocol.
    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.state.engine)
    }

    /// Runs the server: the round-timer task, the sweep task and the
    /// accept loop. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), InkroundError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Inkround server running");

        let engine = Arc::clone(&self.state.engine);
        if let Some(interval) = self.sweep_interval {
            tokio::spawn(sweep_empty_rooms(Arc::clone(&engine), interval));
        }
        tokio::spawn(dispatch_timers(engine, self.fired));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Feeds expired round timers back into the engine.
async fn dispatch_timers(engine: SharedEngine, mut fired: FiredReceiver) {
    while let Some(key) = fired.recv().await {
        engine.lock().await.round_timer_fired(key);
    }
}

/// Periodically reaps rooms that stayed empty past the grace period.
async fn sweep_empty_rooms(engine: SharedEngine, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let removed = engine.lock().await.cleanup_empty_rooms();
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "empty rooms swept");
        }
    }
}
