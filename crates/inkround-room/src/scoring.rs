//! Chat, guess matching and turn scoring.
//!
//! While a turn is drawing, chat from players doubles as guesses. A
//! correct guess is never echoed; a wrong one is masked. Points land in
//! the turn results and are committed to scores when the turn ends.

use std::time::Instant;

use inkround_protocol::{Phase, RoomStatus, ServerEvent, TurnResult};

use crate::palette::SYSTEM_COLOR;
use crate::{Outbox, Room};

/// Sender name of announcements.
pub const SYSTEM_SENDER: &str = "System";

/// Text that replaces a wrong guess.
pub const MASKED_GUESS: &str = "guessed incorrectly";

/// Exact match, ignoring case and surrounding whitespace.
pub fn is_correct_guess(text: &str, word: &str) -> bool {
    text.trim().to_lowercase() == word.trim().to_lowercase()
}

/// Drawer's award, fixed at the first correct guess.
///
/// `min(base, round(time_left / (duration * 0.75) * base))`: full points
/// if someone got it within the first quarter of the turn.
pub fn drawer_points(time_left: f64, round_duration: f64, base_points: u32) -> u32 {
    let base = f64::from(base_points);
    let earned = (time_left / (round_duration * 0.75) * base).round_ties_even();
    earned.clamp(0.0, base) as u32
}

/// Award for a correct guess after the first one, relative to the first
/// guesser's speed.
pub fn guesser_points(time_left: f64, first_guess_time_left: f64, base_points: u32) -> u32 {
    if first_guess_time_left <= 0.0 {
        return 0;
    }
    let earned = (time_left / first_guess_time_left * f64::from(base_points)).round_ties_even();
    earned.max(0.0) as u32
}

/// Seconds into the turn, to a tenth.
pub fn time_taken(round_duration: f64, time_left: f64) -> f64 {
    ((round_duration - time_left) * 10.0).round_ties_even() / 10.0
}

impl Room {
    /// Handles a `CHAT` from `nickname`.
    ///
    /// Outside a drawing phase, and for a spectating host, this is plain
    /// conversation. During drawing it is a guess: the drawer and players
    /// who already guessed are silenced.
    pub fn chat(&mut self, nickname: &str, text: &str, now: Instant) -> Outbox {
        let host_plays = self.config.host_plays;
        let Some(player) = self.players.get(nickname) else {
            return Outbox::new();
        };
        let color = player.color.clone();
        let guessing = self.status == RoomStatus::Playing
            && player.plays(host_plays)
            && self.game.as_ref().is_some_and(|g| g.phase == Phase::Drawing);

        let mut outbox = Outbox::new();
        if !guessing {
            outbox.to_all(ServerEvent::Chat {
                sender: nickname.to_string(),
                color,
                text: text.to_string(),
            });
            return outbox;
        }

        let Some(game) = self.game.as_ref() else {
            return outbox;
        };
        if game.drawer.as_deref() == Some(nickname) {
            tracing::debug!(room_id = %self.id, %nickname, "drawer chat dropped");
            return outbox;
        }
        if game.correct_guessers.iter().any(|n| n == nickname) {
            return outbox;
        }
        let correct = game
            .word
            .as_deref()
            .is_some_and(|word| is_correct_guess(text, word));
        if !correct {
            outbox.to_all(ServerEvent::Chat {
                sender: nickname.to_string(),
                color,
                text: MASKED_GUESS.to_string(),
            });
            return outbox;
        }

        self.record_correct_guess(nickname, now, &mut outbox);
        outbox
    }

    fn record_correct_guess(&mut self, nickname: &str, now: Instant, outbox: &mut Outbox) {
        let base_points = self.config.base_points;
        let duration = f64::from(self.config.round_duration);
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let time_left = game.time_left(now);
        let taken = time_taken(duration, time_left);

        let points = if game.correct_guessers.is_empty() {
            game.first_guess_time_left = time_left;
            game.first_guesser = Some(nickname.to_string());
            if let Some(drawer) = game.drawer.clone() {
                game.turn_results.insert(
                    drawer,
                    TurnResult {
                        points: drawer_points(time_left, duration, base_points),
                        time_taken: taken,
                    },
                );
            }
            base_points
        } else {
            guesser_points(time_left, game.first_guess_time_left, base_points)
        };
        game.turn_results.insert(
            nickname.to_string(),
            TurnResult {
                points,
                time_taken: taken,
            },
        );
        game.correct_guessers.push(nickname.to_string());
        let guessed = game.correct_guessers.len();
        let drawer = game.drawer.clone();
        tracing::info!(room_id = %self.id, %nickname, points, "correct guess");

        outbox.to_all(ServerEvent::Chat {
            sender: SYSTEM_SENDER.to_string(),
            color: SYSTEM_COLOR.to_string(),
            text: format!("{nickname} guessed correctly!"),
        });

        let needed = self
            .eligible_nicknames()
            .iter()
            .filter(|n| Some(n.as_str()) != drawer.as_deref())
            .count();
        if guessed >= needed {
            outbox.extend(self.end_round(now));
        } else {
            self.broadcast_state(now, outbox);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::room::tests::{cid, lobby};

    // =====================================================================
    // Pure scoring
    // =====================================================================

    #[test]
    fn test_is_correct_guess_ignores_case_and_whitespace() {
        assert!(is_correct_guess("  APPLE ", "apple"));
        assert!(is_correct_guess("ice cream", "Ice Cream"));
        assert!(!is_correct_guess("apples", "apple"));
        assert!(!is_correct_guess("icecream", "Ice Cream"));
    }

    #[test]
    fn test_drawer_points_example() {
        assert_eq!(drawer_points(45.0, 60.0, 10), 10);
        assert_eq!(drawer_points(59.0, 60.0, 10), 10, "capped at base");
        assert_eq!(drawer_points(22.5, 60.0, 10), 5);
        assert_eq!(drawer_points(0.0, 60.0, 10), 0);
    }

    #[test]
    fn test_guesser_points_example() {
        assert_eq!(guesser_points(20.0, 45.0, 10), 4);
        assert_eq!(guesser_points(45.0, 45.0, 10), 10);
        assert_eq!(guesser_points(10.0, 0.0, 10), 0);
    }

    #[test]
    fn test_rounding_ties_go_to_even() {
        // 2.5 rounds down, 3.5 rounds up.
        assert_eq!(guesser_points(25.0, 100.0, 10), 2);
        assert_eq!(guesser_points(35.0, 100.0, 10), 4);
    }

    #[test]
    fn test_time_taken_rounds_to_tenth() {
        assert_eq!(time_taken(60.0, 45.0), 15.0);
        assert_eq!(time_taken(60.0, 44.96), 15.0);
        assert_eq!(time_taken(60.0, 20.0), 40.0);
    }

    // =====================================================================
    // Room chat
    // =====================================================================

    /// ada (host), bob, cyd playing; returns (room, drawer, word, t0).
    fn drawing_room() -> (Room, String, String, Instant) {
        let t0 = Instant::now();
        let mut room = lobby(t0);
        for (i, name) in ["ada", "bob", "cyd"].iter().enumerate() {
            room.join(&cid(&format!("c{i}")), name, t0).unwrap();
            room.set_ready(name, true);
        }
        room.start_game("ada", t0).unwrap();
        room.start_round(t0);
        let game = room.game().unwrap();
        let drawer = game.drawer().unwrap().to_string();
        let word = game.word().unwrap().to_string();
        (room, drawer, word, t0)
    }

    fn guessers(room: &Room, drawer: &str) -> Vec<String> {
        room.players()
            .iter()
            .map(|p| p.nickname.clone())
            .filter(|n| n != drawer)
            .collect()
    }

    #[test]
    fn test_chat_in_lobby_is_plain_conversation() {
        let now = Instant::now();
        let mut room = lobby(now);
        room.join(&cid("c0"), "ada", now).unwrap();
        let outbox = room.chat("ada", "hello", now);
        let ServerEvent::Chat { sender, text, .. } = &outbox.messages[0].1 else {
            panic!("expected chat");
        };
        assert_eq!(sender, "ada");
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_chat_from_drawer_is_dropped() {
        let (mut room, drawer, word, t0) = drawing_room();
        assert!(room.chat(&drawer, &word, t0).is_empty());
        assert!(room.chat(&drawer, "hint hint", t0).is_empty());
    }

    #[test]
    fn test_wrong_guess_is_masked() {
        let (mut room, drawer, _, t0) = drawing_room();
        let guesser = guessers(&room, &drawer)[0].clone();
        let outbox = room.chat(&guesser, "definitely not it", t0);
        let ServerEvent::Chat { sender, text, .. } = &outbox.messages[0].1 else {
            panic!("expected chat");
        };
        assert_eq!(sender, &guesser);
        assert_eq!(text, MASKED_GUESS);
    }

    #[test]
    fn test_correct_guesses_score_by_speed() {
        let (mut room, drawer, word, t0) = drawing_room();
        let g = guessers(&room, &drawer);

        let outbox = room.chat(&g[0], &word.to_uppercase(), t0 + Duration::from_secs(15));
        let ServerEvent::Chat { sender, text, color } = &outbox.messages[0].1 else {
            panic!("expected system chat");
        };
        assert_eq!(sender, SYSTEM_SENDER);
        assert_eq!(color, SYSTEM_COLOR);
        assert_eq!(text, &format!("{} guessed correctly!", g[0]));
        assert!(!text.contains(&word));

        let game = room.game().unwrap();
        assert_eq!(game.phase(), Phase::Drawing, "one guesser left");
        assert_eq!(game.first_guesser(), Some(g[0].as_str()));
        assert_eq!(game.turn_results()[&g[0]].points, 10);
        assert_eq!(game.turn_results()[&g[0]].time_taken, 15.0);
        assert_eq!(game.turn_results()[&drawer].points, 10);
        // Not committed yet.
        assert_eq!(room.player(&g[0]).unwrap().score, 0);

        room.chat(&g[1], &word, t0 + Duration::from_secs(40));

        // Everyone guessed: the turn ended and points were committed.
        let game = room.game().unwrap();
        assert_eq!(game.phase(), Phase::DrawerPreparing);
        assert_eq!(game.last_word(), Some(word.as_str()));
        assert_eq!(game.turn_results()[&g[1]].points, 4);
        assert_eq!(room.player(&g[0]).unwrap().score, 10);
        assert_eq!(room.player(&g[1]).unwrap().score, 4);
        assert_eq!(room.player(&drawer).unwrap().score, 10);
    }

    #[test]
    fn test_repeat_guess_after_correct_is_dropped() {
        let (mut room, drawer, word, t0) = drawing_room();
        let g = guessers(&room, &drawer);
        room.chat(&g[0], &word, t0);
        assert!(room.chat(&g[0], &word, t0).is_empty());
        assert!(room.chat(&g[0], "chatting", t0).is_empty());
        assert_eq!(room.game().unwrap().correct_guessers().len(), 1);
    }

    #[test]
    fn test_all_guessed_counts_only_connected_players() {
        let (mut room, drawer, word, t0) = drawing_room();
        let g = guessers(&room, &drawer);
        let gone = room.player(&g[1]).unwrap().connection_id.clone();
        room.mark_disconnected(&gone);

        let outbox = room.chat(&g[0], &word, t0);
        assert_eq!(outbox.timer, Some(crate::TimerCommand::Cancel));
        assert_eq!(room.game().unwrap().phase(), Phase::DrawerPreparing);
    }

    #[test]
    fn test_spectating_host_chats_freely_while_drawing() {
        let t0 = Instant::now();
        let mut room = lobby(t0);
        for (i, name) in ["ada", "bob", "cyd"].iter().enumerate() {
            room.join(&cid(&format!("c{i}")), name, t0).unwrap();
            room.set_ready(name, true);
        }
        room.config.host_plays = false;
        room.start_game("ada", t0).unwrap();
        room.start_round(t0);

        let outbox = room.chat("ada", "nice drawing", t0);
        let ServerEvent::Chat { sender, text, .. } = &outbox.messages[0].1 else {
            panic!("expected chat");
        };
        assert_eq!(sender, "ada");
        assert_eq!(text, "nice drawing");
        assert!(room.game().unwrap().correct_guessers().is_empty());
    }
}
