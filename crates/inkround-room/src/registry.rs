//! Room registry: creates, tracks and reaps rooms.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use inkround_protocol::{
    ConfigPatch, ConnectionId, GameConfig, GameType, RoomId, RoomListing,
};
use inkround_session::{Credentials, Sha256Credentials, generate_room_id, generate_token};

use crate::{JoinOutcome, Outbox, RegistryConfig, Room, RoomError, WordCatalog};

/// Every room on this server, keyed by id.
///
/// This is the entry point for room operations from the engine. It owns
/// the password scheme and the word catalog shared by all rooms.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    config: RegistryConfig,
    credentials: Box<dyn Credentials>,
    words: Arc<WordCatalog>,
}

impl RoomRegistry {
    /// An empty registry with the built-in word catalog and salted
    /// SHA-256 passwords.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            credentials: Box::new(Sha256Credentials),
            words: Arc::new(WordCatalog::default()),
        }
    }

    /// Replaces the word catalog used by rooms created from now on.
    pub fn with_words(mut self, words: WordCatalog) -> Self {
        self.words = Arc::new(words);
        self
    }

    pub fn with_credentials(mut self, credentials: impl Credentials) -> Self {
        self.credentials = Box::new(credentials);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates a lobby room and returns its id.
    ///
    /// An empty password means none. The room counts as empty from `now`
    /// until someone joins.
    ///
    /// # Errors
    /// [`RoomError::NameConflict`] if an existing room has the same name,
    /// ignoring case.
    pub fn create_room(
        &mut self,
        name: &str,
        password: Option<&str>,
        game_type: GameType,
        config: Option<&ConfigPatch>,
        now: Instant,
    ) -> Result<RoomId, RoomError> {
        let name = name.trim();
        let lowered = name.to_lowercase();
        if self
            .rooms
            .values()
            .any(|room| room.name().to_lowercase() == lowered)
        {
            return Err(RoomError::NameConflict(name.to_string()));
        }

        let room_id = loop {
            let candidate = RoomId(generate_room_id());
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let password_hash = password
            .filter(|p| !p.is_empty())
            .map(|p| self.credentials.hash(p));
        let room = Room::new(
            room_id.clone(),
            name,
            password_hash,
            generate_token(),
            game_type,
            GameConfig::merged(config),
            Arc::clone(&self.words),
            now,
        );
        tracing::info!(%room_id, %name, protected = room.has_password(), "room created");
        self.rooms.insert(room_id.clone(), room);
        Ok(room_id)
    }

    /// Admits a connection to a room after checking its credentials.
    ///
    /// A protected room accepts either the password or the room token
    /// that every earlier joiner received.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] for an unknown room.
    /// - [`RoomError::WrongPassword`] if neither credential matches.
    /// - Any error of [`Room::join`].
    pub fn join(
        &mut self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        nickname: &str,
        password: Option<&str>,
        token: Option<&str>,
        now: Instant,
    ) -> Result<(JoinOutcome, Outbox), RoomError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        if let Some(stored) = room.password_hash.as_deref() {
            let token_ok = token.is_some_and(|t| t == room.token);
            let password_ok = password.is_some_and(|p| self.credentials.verify(p, stored));
            if !token_ok && !password_ok {
                tracing::info!(%room_id, %nickname, "join rejected: wrong password");
                return Err(RoomError::WrongPassword);
            }
        }
        room.join(connection_id, nickname, now)
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn remove(&mut self, room_id: &RoomId) -> Option<Room> {
        let room = self.rooms.remove(room_id);
        if room.is_some() {
            tracing::info!(%room_id, "room removed");
        }
        room
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Listings for the room browser, sorted by name.
    pub fn rooms(&self) -> Vec<RoomListing> {
        let mut listings: Vec<RoomListing> = self.rooms.values().map(Room::listing).collect();
        listings.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        listings
    }

    /// Languages and their difficulties, for the create-room form.
    pub fn word_set_metadata(&self) -> BTreeMap<String, Vec<String>> {
        self.words.metadata()
    }

    /// Removes rooms that have had no live connection for longer than the
    /// grace period and returns their ids.
    pub fn cleanup_empty_rooms(&mut self, now: Instant) -> Vec<RoomId> {
        let grace = self.config.empty_room_grace;
        let expired: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| {
                room.empty_since()
                    .is_some_and(|since| now.saturating_duration_since(since) > grace)
            })
            .map(|room| room.id().clone())
            .collect();
        for room_id in &expired {
            self.rooms.remove(room_id);
            tracing::info!(%room_id, "empty room cleaned up");
        }
        expired
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.rooms.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
