//! The turn state machine.
//!
//! ```text
//! start_game ─→ PRE_ROUND ─→ next_turn ─→ DRAWER_PREPARING
//!                                ↑               │ start_round
//!                                │               ↓
//!                            end_round ←──── DRAWING ←─ (all guessed | timer)
//!
//! next_turn ─→ GAME_OVER   when a score reached points_to_win (round > 0)
//!                          or nobody is left to draw
//!
//! return_to_lobby ─→ lobby  (host, from any phase)
//! ```
//!
//! Every transition that clients should see ends with a viewer-specific
//! `GAME_STATE_UPDATE` to each connected player.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use inkround_protocol::{ConnectionId, Phase, RoomStatus, ServerEvent};
use inkround_timer::{Deadline, TimerKey};
use rand::seq::SliceRandom;

use crate::game_state::GameState;
use crate::words::obfuscate;
use crate::{Outbox, Room, RoomError};

impl Room {
    /// Connected players who draw and guess.
    pub(crate) fn eligible_nicknames(&self) -> Vec<String> {
        let host_plays = self.config.host_plays;
        self.players()
            .into_iter()
            .filter(|p| p.connected && p.plays(host_plays))
            .map(|p| p.nickname.clone())
            .collect()
    }

    /// Committed score of every registered player.
    pub fn scores(&self) -> BTreeMap<String, u32> {
        self.players
            .values()
            .map(|p| (p.nickname.clone(), p.score))
            .collect()
    }

    /// At least two eligible connected players, all of them ready.
    pub fn can_start(&self) -> bool {
        let host_plays = self.config.host_plays;
        let eligible: Vec<_> = self
            .players
            .values()
            .filter(|p| p.connected && p.plays(host_plays))
            .collect();
        eligible.len() >= 2 && eligible.iter().all(|p| p.is_ready)
    }

    /// Starts a fresh game. Host only.
    ///
    /// Ignored while a game is already running; allowed again after
    /// `GAME_OVER`.
    ///
    /// # Errors
    /// - [`RoomError::NotAuthorized`] for anyone but the host.
    /// - [`RoomError::CannotStart`] when [`can_start`](Self::can_start) fails.
    pub fn start_game(&mut self, nickname: &str, now: Instant) -> Result<Outbox, RoomError> {
        if !self.is_host(nickname) {
            return Err(RoomError::NotAuthorized);
        }
        let running = self
            .game
            .as_ref()
            .is_some_and(|g| g.phase != Phase::GameOver);
        if self.status == RoomStatus::Playing && running {
            tracing::debug!(room_id = %self.id, "start_game while playing ignored");
            return Ok(Outbox::new());
        }
        if !self.can_start() {
            return Err(RoomError::CannotStart);
        }

        self.game = Some(GameState::default());
        for player in self.players.values_mut() {
            player.score = 0;
        }
        self.status = RoomStatus::Playing;
        tracing::info!(room_id = %self.id, players = self.players.len(), "game started");

        let mut outbox = Outbox::new();
        outbox.cancel_timer();
        outbox.extend(self.next_turn(now));
        Ok(outbox)
    }

    /// Deals the next turn, or ends the game.
    pub(crate) fn next_turn(&mut self, now: Instant) -> Outbox {
        let eligible = self.eligible_nicknames();
        let points_to_win = self.config.points_to_win;
        let someone_won = self.players.values().any(|p| p.score >= points_to_win);

        let Some(game) = self.game.as_mut() else {
            return Outbox::new();
        };

        if game.round > 0 && someone_won {
            return self.end_game(now);
        }

        // Seats vacated since the queue was built are skipped.
        while game
            .turn_queue
            .front()
            .is_some_and(|n| !eligible.contains(n))
        {
            game.turn_queue.pop_front();
        }
        if game.turn_queue.is_empty() {
            let mut queue = eligible;
            queue.shuffle(&mut rand::rng());
            game.turn_queue = VecDeque::from(queue);
            game.round += 1;
        }
        let Some(drawer) = game.turn_queue.pop_front() else {
            return self.end_game(now);
        };

        let Some(word) = self.words.pick(
            &self.config.word_language,
            &self.config.word_difficulty,
            &mut game.used_words,
        ) else {
            tracing::warn!(room_id = %self.id, "word catalog has no words");
            return self.end_game(now);
        };

        self.turns_dealt += 1;
        game.turn = self.turns_dealt;
        game.word_hints = obfuscate(&word);
        game.drawer = Some(drawer);
        game.word = Some(word);
        game.phase = Phase::DrawerPreparing;
        game.deadline = None;
        game.correct_guessers.clear();
        game.first_guess_time_left = 0.0;
        game.strokes.clear();
        tracing::info!(
            room_id = %self.id,
            round = game.round,
            turn = game.turn,
            drawer = ?game.drawer,
            "turn dealt"
        );

        let mut outbox = Outbox::new();
        self.broadcast_state(now, &mut outbox);
        outbox
    }

    /// Starts the clock of a prepared turn. Any joined player may ask;
    /// outside `DRAWER_PREPARING` nothing happens.
    pub fn start_round(&mut self, now: Instant) -> Outbox {
        let round_duration = self.config.round_duration();
        let Some(game) = self.game.as_mut() else {
            return Outbox::new();
        };
        if game.phase != Phase::DrawerPreparing {
            tracing::debug!(room_id = %self.id, phase = %game.phase, "start_round ignored");
            return Outbox::new();
        }
        let (Some(drawer), Some(word)) = (game.drawer.clone(), game.word.clone()) else {
            return Outbox::new();
        };
        let turn = game.turn;

        game.deadline = Some(Deadline::start(now, round_duration));
        game.turn_results.clear();
        game.first_guesser = None;
        game.phase = Phase::Drawing;
        tracing::info!(room_id = %self.id, %drawer, "drawing started");

        let mut outbox = Outbox::new();
        self.broadcast_state(now, &mut outbox);
        outbox.arm_timer(
            TimerKey::new(self.id.clone(), turn, drawer, word),
            round_duration,
        );
        outbox
    }

    /// The round clock ran out. Ends the turn only if `key` still names
    /// the drawing turn it was armed for.
    pub fn round_timer_fired(&mut self, key: &TimerKey, now: Instant) -> Outbox {
        let current = self.game.as_ref().is_some_and(|g| {
            g.phase == Phase::Drawing
                && g.turn == key.turn
                && g.drawer.as_deref() == Some(key.drawer.as_str())
                && g.word.as_deref() == Some(key.word.as_str())
        });
        if !current || key.room_id != self.id {
            tracing::debug!(
                room_id = %self.id,
                turn = key.turn,
                drawer = %key.drawer,
                "stale round timer ignored"
            );
            return Outbox::new();
        }
        tracing::info!(room_id = %self.id, drawer = %key.drawer, "round time is up");
        self.end_round(now)
    }

    /// Closes the current turn: reveals it, commits its points, deals the
    /// next one.
    ///
    /// Only points earned while drawing are committed; a turn ended before
    /// its clock started scores nothing.
    pub fn end_round(&mut self, now: Instant) -> Outbox {
        let Some(game) = self.game.as_mut() else {
            return Outbox::new();
        };
        if !game.phase.has_active_drawer() {
            return Outbox::new();
        }
        let was_drawing = game.phase == Phase::Drawing;
        game.last_drawer = game.drawer.clone();
        game.last_word = game.word.clone();
        game.deadline = None;

        if was_drawing {
            for (nickname, result) in &game.turn_results {
                if let Some(player) = self.players.get_mut(nickname) {
                    player.score = player.score.saturating_add(result.points);
                }
            }
        }
        tracing::info!(room_id = %self.id, last_word = ?game.last_word, "turn ended");

        let mut outbox = Outbox::new();
        outbox.cancel_timer();
        outbox.extend(self.next_turn(now));
        outbox
    }

    /// Terminal: `GAME_OVER`, word revealed to all.
    pub fn end_game(&mut self, now: Instant) -> Outbox {
        let Some(game) = self.game.as_mut() else {
            return Outbox::new();
        };
        game.phase = Phase::GameOver;
        game.deadline = None;
        tracing::info!(room_id = %self.id, round = game.round, "game over");

        let mut outbox = Outbox::new();
        outbox.cancel_timer();
        self.broadcast_state(now, &mut outbox);
        outbox
    }

    /// Abandons any game and reopens the lobby. Host only.
    ///
    /// Scores are zeroed and everyone has to ready up again. In the lobby
    /// nothing happens.
    ///
    /// # Errors
    /// [`RoomError::NotAuthorized`] for anyone but the host.
    pub fn return_to_lobby(&mut self, nickname: &str) -> Result<Outbox, RoomError> {
        if !self.is_host(nickname) {
            return Err(RoomError::NotAuthorized);
        }
        if self.status == RoomStatus::Lobby {
            return Ok(Outbox::new());
        }
        self.status = RoomStatus::Lobby;
        self.game = None;
        for player in self.players.values_mut() {
            player.score = 0;
            player.is_ready = false;
        }
        tracing::info!(room_id = %self.id, "back to lobby");

        let mut outbox = Outbox::new();
        outbox.cancel_timer();
        outbox.to_all(ServerEvent::ReturnedToLobby {
            players: self.connected_summaries(),
            config: self.config.clone(),
        });
        Ok(outbox)
    }

    fn state_update_for(&self, game: &GameState, viewer: &str, now: Instant) -> ServerEvent {
        ServerEvent::GameStateUpdate {
            game_state: game.view_for(viewer, now),
            scores: self.scores(),
            turn_results: game.turn_results.clone(),
        }
    }

    /// Queues a viewer-specific state update for every connected player.
    pub(crate) fn broadcast_state(&self, now: Instant, outbox: &mut Outbox) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        for player in self.players().into_iter().filter(|p| p.connected) {
            outbox.to(
                &player.connection_id,
                self.state_update_for(game, &player.nickname, now),
            );
        }
    }

    /// Brings a (re)joining client up to date: state first, then the full
    /// canvas.
    pub(crate) fn sync_late_joiner(
        &self,
        connection_id: &ConnectionId,
        nickname: &str,
        now: Instant,
        outbox: &mut Outbox,
    ) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        outbox.to(connection_id, self.state_update_for(game, nickname, now));
        outbox.to(
            connection_id,
            ServerEvent::StrokeHistoryUpdate {
                history: game.strokes().to_vec(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::room::tests::{cid, lobby};

    fn ready_room(names: &[&str], now: Instant) -> Room {
        let mut room = lobby(now);
        for (i, name) in names.iter().enumerate() {
            room.join(&cid(&format!("c{i}")), name, now).unwrap();
            room.set_ready(name, true);
        }
        room
    }

    #[test]
    fn test_can_start_needs_two_ready_players() {
        let now = Instant::now();
        let mut room = ready_room(&["ada"], now);
        assert!(!room.can_start());

        room.join(&cid("c1"), "bob", now).unwrap();
        assert!(!room.can_start(), "bob is not ready");

        room.set_ready("bob", true);
        assert!(room.can_start());
    }

    #[test]
    fn test_can_start_excludes_spectating_host() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.config.host_plays = false;
        assert!(!room.can_start(), "only bob plays");

        room.join(&cid("c2"), "cyd", now).unwrap();
        room.set_ready("cyd", true);
        room.set_ready("ada", false);
        assert!(room.can_start(), "spectating host need not be ready");
    }

    #[test]
    fn test_start_game_by_non_host_is_not_authorized() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        assert_eq!(room.start_game("bob", now).unwrap_err(), RoomError::NotAuthorized);
        assert_eq!(room.status(), RoomStatus::Lobby);
    }

    #[test]
    fn test_start_game_unready_is_cannot_start() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.set_ready("bob", false);
        assert_eq!(room.start_game("ada", now).unwrap_err(), RoomError::CannotStart);
    }

    #[test]
    fn test_start_game_deals_first_turn() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob", "cyd"], now);
        room.players.get_mut("bob").unwrap().score = 40;

        let outbox = room.start_game("ada", now).unwrap();

        let game = room.game().unwrap();
        assert_eq!(room.status(), RoomStatus::Playing);
        assert_eq!(game.phase(), Phase::DrawerPreparing);
        assert_eq!(game.round(), 1);
        assert_eq!(game.turn_queue().count(), 2);
        assert!(game.word().is_some());
        assert!(room.players().iter().all(|p| p.score == 0));
        // One state update per connected player.
        let updates = outbox
            .messages
            .iter()
            .filter(|(_, e)| matches!(e, ServerEvent::GameStateUpdate { .. }))
            .count();
        assert_eq!(updates, 3);
    }

    #[test]
    fn test_next_turn_every_player_draws_once_per_round() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob", "cyd", "dee"], now);
        room.start_game("ada", now).unwrap();

        let mut drawers = HashSet::new();
        for _ in 0..4 {
            let game = room.game().unwrap();
            assert_eq!(game.round(), 1);
            assert!(drawers.insert(game.drawer().unwrap().to_string()));
            room.end_round(now);
        }
        assert_eq!(drawers.len(), 4);
        assert_eq!(room.game().unwrap().round(), 2, "exactly one reshuffle");
        assert_eq!(room.game().unwrap().turn_queue().count(), 3);
    }

    #[test]
    fn test_next_turn_skips_spectating_host() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob", "cyd"], now);
        room.config.host_plays = false;
        room.start_game("ada", now).unwrap();
        for _ in 0..4 {
            assert_ne!(room.game().unwrap().drawer(), Some("ada"));
            room.end_round(now);
        }
    }

    #[test]
    fn test_word_only_visible_to_drawer() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        let outbox = room.start_game("ada", now).unwrap();
        let drawer = room.game().unwrap().drawer().unwrap().to_string();
        let word = room.game().unwrap().word().unwrap().to_string();

        for (to, event) in &outbox.messages {
            let ServerEvent::GameStateUpdate { game_state, .. } = event else {
                continue;
            };
            let inkround_protocol::Recipient::Connection(conn) = to else {
                panic!("state updates are per viewer");
            };
            let viewer = room.nickname_of(conn).unwrap();
            if viewer == drawer {
                assert_eq!(game_state.word.as_deref(), Some(word.as_str()));
            } else {
                assert_eq!(game_state.word, None);
            }
        }
    }

    #[test]
    fn test_start_round_arms_timer_and_sets_deadline() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();

        let outbox = room.start_round(now);

        let game = room.game().unwrap();
        assert_eq!(game.phase(), Phase::Drawing);
        assert!(game.timer_end() > 0.0);
        let Some(crate::TimerCommand::Arm { key, after }) = outbox.timer else {
            panic!("timer must be armed");
        };
        assert_eq!(after, Duration::from_secs(60));
        assert_eq!(Some(key.drawer.as_str()), game.drawer());
        assert_eq!(Some(key.word.as_str()), game.word());
    }

    #[test]
    fn test_start_round_outside_preparing_is_ignored() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        room.start_round(now);
        assert!(room.start_round(now).is_empty());
    }

    #[test]
    fn test_round_timer_fired_ends_matching_turn() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        let outbox = room.start_round(now);
        let Some(crate::TimerCommand::Arm { key, .. }) = outbox.timer else {
            panic!("timer must be armed");
        };

        room.round_timer_fired(&key, now + Duration::from_secs(60));

        let game = room.game().unwrap();
        assert_eq!(game.phase(), Phase::DrawerPreparing);
        assert_eq!(game.last_drawer(), Some(key.drawer.as_str()));
        assert_eq!(game.timer_end(), 0.0);
    }

    #[test]
    fn test_round_timer_fired_for_stale_turn_is_noop() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        let outbox = room.start_round(now);
        let Some(crate::TimerCommand::Arm { key, .. }) = outbox.timer else {
            panic!("timer must be armed");
        };
        room.end_round(now);
        let round_before = room.game().unwrap().round();
        let drawer_before = room.game().unwrap().drawer().map(str::to_string);

        assert!(room.round_timer_fired(&key, now).is_empty());
        assert_eq!(room.game().unwrap().phase(), Phase::DrawerPreparing);
        assert_eq!(room.game().unwrap().round(), round_before);
        assert_eq!(room.game().unwrap().drawer().map(str::to_string), drawer_before);
    }

    #[test]
    fn test_win_check_waits_for_turn_boundary() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.config.points_to_win = 10;
        room.start_game("ada", now).unwrap();
        room.start_round(now);

        // A threshold crossed mid-turn changes nothing by itself.
        room.players.get_mut("bob").unwrap().score = 10;
        assert_eq!(room.game().unwrap().phase(), Phase::Drawing);

        room.end_round(now);
        assert_eq!(room.game().unwrap().phase(), Phase::GameOver);
    }

    #[test]
    fn test_end_game_reveals_word_to_everyone() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        let word = room.game().unwrap().word().unwrap().to_string();

        let outbox = room.end_game(now);

        assert_eq!(outbox.timer, Some(crate::TimerCommand::Cancel));
        for (_, event) in &outbox.messages {
            if let ServerEvent::GameStateUpdate { game_state, .. } = event {
                assert_eq!(game_state.phase, Phase::GameOver);
                assert_eq!(game_state.word.as_deref(), Some(word.as_str()));
            }
        }
    }

    #[test]
    fn test_game_ends_when_nobody_left_to_draw() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        room.mark_disconnected(&cid("c0"));
        room.mark_disconnected(&cid("c1"));

        room.end_round(now);
        assert_eq!(room.game().unwrap().phase(), Phase::GameOver);
    }

    #[test]
    fn test_start_game_again_after_game_over_resets() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        room.end_game(now);

        room.start_game("ada", now).unwrap();
        let game = room.game().unwrap();
        assert_eq!(game.phase(), Phase::DrawerPreparing);
        assert_eq!(game.round(), 1);
        assert_eq!(game.last_word(), None);
    }

    #[test]
    fn test_start_game_while_running_is_ignored() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        let drawer = room.game().unwrap().drawer().map(str::to_string);
        assert!(room.start_game("ada", now).unwrap().is_empty());
        assert_eq!(room.game().unwrap().drawer().map(str::to_string), drawer);
    }

    #[test]
    fn test_next_turn_does_not_repeat_words_within_a_game() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.words = std::sync::Arc::new(
            crate::WordCatalog::from_json(r#"{"English": {"Easy": ["sun", "moon", "star"]}}"#)
                .unwrap(),
        );
        room.start_game("ada", now).unwrap();

        let mut words = HashSet::new();
        for _ in 0..3 {
            words.insert(room.game().unwrap().word().unwrap().to_string());
            room.end_round(now);
        }
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn test_round_timer_fired_from_earlier_turn_with_same_drawer_and_word_is_noop() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        let Some(crate::TimerCommand::Arm { key: old_key, .. }) = room.start_round(now).timer
        else {
            panic!("timer must be armed");
        };
        room.end_round(now);

        // The next turn happens to deal the same drawer and word.
        let game = room.game.as_mut().unwrap();
        game.drawer = Some(old_key.drawer.clone());
        game.word = Some(old_key.word.clone());
        let Some(crate::TimerCommand::Arm { key: new_key, .. }) = room.start_round(now).timer
        else {
            panic!("timer must be armed");
        };
        assert_ne!(old_key.turn, new_key.turn);

        assert!(room.round_timer_fired(&old_key, now).is_empty());
        assert_eq!(room.game().unwrap().phase(), Phase::Drawing);

        room.round_timer_fired(&new_key, now + Duration::from_secs(60));
        assert_eq!(room.game().unwrap().phase(), Phase::DrawerPreparing);
    }

    #[test]
    fn test_end_round_score_saturates_instead_of_overflowing() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.config.points_to_win = u32::MAX;
        room.start_game("ada", now).unwrap();
        room.start_round(now);
        room.players.get_mut("bob").unwrap().score = u32::MAX - 1;
        room.game.as_mut().unwrap().turn_results.insert(
            "bob".to_string(),
            inkround_protocol::TurnResult {
                points: u32::MAX,
                time_taken: 1.0,
            },
        );

        room.end_round(now);
        assert_eq!(room.player("bob").unwrap().score, u32::MAX);
    }

    #[test]
    fn test_return_to_lobby_reopens_joins_and_config() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        room.players.get_mut("bob").unwrap().score = 30;
        room.end_game(now);

        let outbox = room.return_to_lobby("ada").unwrap();

        assert_eq!(outbox.timer, Some(crate::TimerCommand::Cancel));
        assert!(matches!(
            outbox.messages[0].1,
            ServerEvent::ReturnedToLobby { .. }
        ));
        assert_eq!(room.status(), RoomStatus::Lobby);
        assert!(room.game().is_none());
        assert!(room.players().iter().all(|p| p.score == 0 && !p.is_ready));

        room.join(&cid("c2"), "cyd", now).unwrap();
        let patch = inkround_protocol::ConfigPatch {
            points_to_win: Some(20),
            ..Default::default()
        };
        assert!(!room.update_config("ada", &patch).is_empty());
        assert_eq!(room.config().points_to_win, 20);
    }

    #[test]
    fn test_return_to_lobby_by_non_host_is_not_authorized() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();

        assert_eq!(room.return_to_lobby("bob"), Err(RoomError::NotAuthorized));
        assert_eq!(room.status(), RoomStatus::Playing);
    }

    #[test]
    fn test_return_to_lobby_mid_turn_cancels_timer() {
        let now = Instant::now();
        let mut room = ready_room(&["ada", "bob"], now);
        room.start_game("ada", now).unwrap();
        room.start_round(now);

        let outbox = room.return_to_lobby("ada").unwrap();
        assert_eq!(outbox.timer, Some(crate::TimerCommand::Cancel));
        assert!(room.return_to_lobby("ada").unwrap().is_empty());
    }
}
