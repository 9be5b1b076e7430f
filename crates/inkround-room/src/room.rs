//! A room: roster, config and lifecycle.
//!
//! Game flow lives in `turn.rs`, chat and guesses in `scoring.rs`, the
//! canvas in `strokes.rs`; all of them are `impl Room` blocks over the
//! struct defined here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use inkround_protocol::{
    ConfigPatch, ConnectionId, DEFAULT_NICKNAME, GameConfig, GameType, PlayerSummary, RoomId,
    RoomListing, RoomStatus, ServerEvent,
};

use crate::game_state::GameState;
use crate::palette::pick_color;
use crate::{Outbox, Player, RoomError, WordCatalog};

/// How a successful join was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new nickname entered the roster.
    Joined,
    /// A disconnected nickname was reattached to a new connection.
    Reconnected,
}

/// One isolated game session.
#[derive(Debug)]
pub struct Room {
    pub(crate) id: RoomId,
    pub(crate) name: String,
    pub(crate) password_hash: Option<String>,
    /// Shared with every joined client; bypasses the password on rejoin.
    pub(crate) token: String,
    pub(crate) game_type: GameType,
    pub(crate) config: GameConfig,
    pub(crate) status: RoomStatus,
    pub(crate) players: HashMap<String, Player>,
    pub(crate) next_seq: u64,
    /// Turns dealt over the room's lifetime; numbers each new turn.
    pub(crate) turns_dealt: u64,
    /// When the room last lost its final live connection.
    pub(crate) empty_since: Option<Instant>,
    pub(crate) game: Option<GameState>,
    pub(crate) words: Arc<WordCatalog>,
}

impl Room {
    /// A room in the lobby, counted as empty from `now`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RoomId,
        name: &str,
        password_hash: Option<String>,
        token: String,
        game_type: GameType,
        config: GameConfig,
        words: Arc<WordCatalog>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            password_hash,
            token,
            game_type,
            config,
            status: RoomStatus::Lobby,
            players: HashMap::new(),
            next_seq: 0,
            turns_dealt: 0,
            empty_since: Some(now),
            game: None,
            words,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn empty_since(&self) -> Option<Instant> {
        self.empty_since
    }

    pub fn player(&self, nickname: &str) -> Option<&Player> {
        self.players.get(nickname)
    }

    /// Registered players in join order.
    pub fn players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.joined_seq);
        players
    }

    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|p| p.connected).count()
    }

    /// The connected player bound to `connection_id`, if any.
    pub fn nickname_of(&self, connection_id: &ConnectionId) -> Option<&str> {
        self.players
            .values()
            .find(|p| p.connected && &p.connection_id == connection_id)
            .map(|p| p.nickname.as_str())
    }

    pub fn host(&self) -> Option<&str> {
        self.players
            .values()
            .find(|p| p.is_host)
            .map(|p| p.nickname.as_str())
    }

    pub fn is_host(&self, nickname: &str) -> bool {
        self.players.get(nickname).is_some_and(|p| p.is_host)
    }

    pub fn listing(&self) -> RoomListing {
        RoomListing {
            id: self.id.clone(),
            name: self.name.clone(),
            game_type: self.game_type,
            has_password: self.has_password(),
            players_count: self.connected_count(),
            state: self.status,
        }
    }

    pub(crate) fn connected_summaries(&self) -> Vec<PlayerSummary> {
        self.players()
            .into_iter()
            .filter(|p| p.connected)
            .map(Player::summary)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Occupancy
    // -----------------------------------------------------------------------

    /// A live connection landed; the room is no longer empty.
    pub fn mark_occupied(&mut self) {
        self.empty_since = None;
    }

    /// The last live connection went away at `now`. Keeps an earlier stamp.
    pub fn mark_empty(&mut self, now: Instant) {
        self.empty_since.get_or_insert(now);
    }

    // -----------------------------------------------------------------------
    // Roster operations
    // -----------------------------------------------------------------------

    /// Admits `nickname` on `connection_id`. The password has already been
    /// checked by the registry.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyJoined`] if the connection already plays.
    /// - [`RoomError::NicknameTaken`] if a connected player has the nickname.
    /// - [`RoomError::GameAlreadyStarted`] for a new nickname after the lobby.
    pub fn join(
        &mut self,
        connection_id: &ConnectionId,
        nickname: &str,
        now: Instant,
    ) -> Result<(JoinOutcome, Outbox), RoomError> {
        let nickname = match nickname.trim() {
            "" => DEFAULT_NICKNAME,
            trimmed => trimmed,
        };
        if self.nickname_of(connection_id).is_some() {
            return Err(RoomError::AlreadyJoined);
        }

        let outcome = match self.players.get_mut(nickname) {
            Some(existing) if existing.connected => {
                return Err(RoomError::NicknameTaken(nickname.to_string()));
            }
            Some(existing) => {
                existing.connection_id = connection_id.clone();
                existing.connected = true;
                JoinOutcome::Reconnected
            }
            None => {
                if !self.status.is_joinable() {
                    return Err(RoomError::GameAlreadyStarted);
                }
                let color = pick_color(self.players.values().map(|p| p.color.as_str()));
                let is_host = self.players.is_empty();
                let player = Player::new(nickname, connection_id.clone(), is_host, color, self.next_seq);
                self.next_seq += 1;
                self.players.insert(nickname.to_string(), player);
                JoinOutcome::Joined
            }
        };
        self.empty_since = None;

        let Some(player) = self.players.get(nickname) else {
            return Err(RoomError::NotFound(self.id.clone()));
        };
        tracing::info!(room_id = %self.id, %nickname, %connection_id, ?outcome, "player joined");

        let mut outbox = Outbox::new();
        outbox.to(
            connection_id,
            ServerEvent::JoinSuccess {
                room_id: self.id.clone(),
                nickname: nickname.to_string(),
                is_host: player.is_host,
                players: self.connected_summaries(),
                state: self.status,
                game_type: self.game_type,
                config: self.config.clone(),
                token: self.token.clone(),
            },
        );
        let announce = match outcome {
            JoinOutcome::Joined => ServerEvent::PlayerJoined {
                nickname: nickname.to_string(),
                is_ready: player.is_ready,
                color: player.color.clone(),
                total_players: self.connected_count(),
            },
            JoinOutcome::Reconnected => ServerEvent::PlayerReconnected {
                nickname: nickname.to_string(),
            },
        };
        outbox.to_all(announce);

        if self.status == RoomStatus::Playing {
            self.sync_late_joiner(connection_id, nickname, now, &mut outbox);
        }
        Ok((outcome, outbox))
    }

    pub fn set_ready(&mut self, nickname: &str, is_ready: bool) -> Outbox {
        let Some(player) = self.players.get_mut(nickname) else {
            return Outbox::new();
        };
        player.is_ready = is_ready;
        let mut outbox = Outbox::new();
        outbox.to_all(ServerEvent::PlayerUpdate {
            nickname: nickname.to_string(),
            is_ready,
        });
        outbox
    }

    /// Merges `patch` into the config. Host-only and lobby-only; anything
    /// else is ignored.
    pub fn update_config(&mut self, nickname: &str, patch: &ConfigPatch) -> Outbox {
        if !self.is_host(nickname) {
            tracing::debug!(room_id = %self.id, %nickname, "config update from non-host ignored");
            return Outbox::new();
        }
        if self.status != RoomStatus::Lobby {
            tracing::debug!(room_id = %self.id, "config update outside lobby ignored");
            return Outbox::new();
        }
        self.config.apply(patch);
        let mut outbox = Outbox::new();
        outbox.to_all(ServerEvent::ConfigUpdate {
            config: self.config.clone(),
        });
        outbox
    }

    /// Flips the player on `connection_id` to disconnected and returns
    /// their nickname. The player keeps their seat, score and color.
    pub fn mark_disconnected(&mut self, connection_id: &ConnectionId) -> Option<String> {
        let player = self
            .players
            .values_mut()
            .find(|p| p.connected && &p.connection_id == connection_id)?;
        player.connected = false;
        tracing::info!(room_id = %self.id, nickname = %player.nickname, "player disconnected");
        Some(player.nickname.clone())
    }

    /// [`mark_disconnected`](Self::mark_disconnected) plus the
    /// `PLAYER_DISCONNECTED` notice.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Outbox {
        let mut outbox = Outbox::new();
        if let Some(nickname) = self.mark_disconnected(connection_id) {
            outbox.to_all(ServerEvent::PlayerDisconnected { nickname });
        }
        outbox
    }

    /// Removes `nickname` from the room for good.
    ///
    /// The host role passes to the earliest remaining player. A drawer
    /// leaving mid-turn ends the turn.
    pub fn leave(&mut self, nickname: &str, now: Instant) -> Outbox {
        let Some(player) = self.players.remove(nickname) else {
            return Outbox::new();
        };
        tracing::info!(room_id = %self.id, %nickname, "player left");

        let mut outbox = Outbox::new();
        outbox.to(&player.connection_id, ServerEvent::LeftRoom {});
        outbox.to_all_except(
            &player.connection_id,
            ServerEvent::PlayerLeft {
                nickname: nickname.to_string(),
            },
        );

        if player.is_host {
            let successor = self
                .players
                .values_mut()
                .min_by_key(|p| p.joined_seq);
            if let Some(successor) = successor {
                successor.is_host = true;
                tracing::info!(room_id = %self.id, host = %successor.nickname, "host passed on");
            }
        }

        let was_drawing = match self.game.as_mut() {
            Some(game) => {
                game.turn_queue.retain(|n| n != nickname);
                game.is_active_drawer(nickname)
            }
            None => false,
        };
        if was_drawing {
            outbox.extend(self.end_round(now));
        } else if self.status == RoomStatus::Playing {
            self.broadcast_state(now, &mut outbox);
        }
        outbox
    }

    /// Checks that `nickname` may close the room.
    ///
    /// # Errors
    /// [`RoomError::NotAuthorized`] for anyone but the host.
    pub fn authorize_close(&self, nickname: &str) -> Result<(), RoomError> {
        if self.is_host(nickname) {
            Ok(())
        } else {
            Err(RoomError::NotAuthorized)
        }
    }
}
