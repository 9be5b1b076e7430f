//! Per-game state of a playing room.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Instant;

use inkround_protocol::{GameStateView, Phase, Stroke, TurnResult};
use inkround_timer::Deadline;

use crate::strokes::StrokeLedger;

/// Everything a running game tracks beyond the roster.
///
/// Exists only while the room is playing; `start_game` replaces it with a
/// fresh one.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Incremented each time the turn queue is refilled.
    pub(crate) round: u32,
    /// Sequence number of the current turn within the room.
    pub(crate) turn: u64,
    /// Nicknames still owed a turn this round, front draws next.
    pub(crate) turn_queue: VecDeque<String>,
    pub(crate) drawer: Option<String>,
    pub(crate) word: Option<String>,
    /// Words already dealt this game.
    pub(crate) used_words: HashSet<String>,
    pub(crate) word_hints: String,
    pub(crate) phase: Phase,
    /// Set iff `phase == Drawing`.
    pub(crate) deadline: Option<Deadline>,
    pub(crate) correct_guessers: Vec<String>,
    /// Seconds left on the clock at the first correct guess of the turn.
    pub(crate) first_guess_time_left: f64,
    pub(crate) first_guesser: Option<String>,
    pub(crate) last_drawer: Option<String>,
    pub(crate) last_word: Option<String>,
    /// Uncommitted points of the current (or just finished) turn.
    pub(crate) turn_results: BTreeMap<String, TurnResult>,
    pub(crate) strokes: StrokeLedger,
}

impl GameState {
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn drawer(&self) -> Option<&str> {
        self.drawer.as_deref()
    }

    /// The secret word. Not for display; see [`view_for`](Self::view_for).
    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    pub fn word_hints(&self) -> &str {
        &self.word_hints
    }

    pub fn turn_queue(&self) -> impl Iterator<Item = &str> {
        self.turn_queue.iter().map(String::as_str)
    }

    pub fn correct_guessers(&self) -> &[String] {
        &self.correct_guessers
    }

    pub fn first_guesser(&self) -> Option<&str> {
        self.first_guesser.as_deref()
    }

    pub fn last_drawer(&self) -> Option<&str> {
        self.last_drawer.as_deref()
    }

    pub fn last_word(&self) -> Option<&str> {
        self.last_word.as_deref()
    }

    pub fn turn_results(&self) -> &BTreeMap<String, TurnResult> {
        &self.turn_results
    }

    pub fn strokes(&self) -> &[Stroke] {
        self.strokes.as_slice()
    }

    /// Whether `nickname` is the drawer of an active turn.
    pub fn is_active_drawer(&self, nickname: &str) -> bool {
        self.phase.has_active_drawer() && self.drawer.as_deref() == Some(nickname)
    }

    /// Unix seconds at which drawing ends, `0.0` when no clock runs.
    pub fn timer_end(&self) -> f64 {
        self.deadline.map_or(0.0, |d| d.ends_unix())
    }

    /// Seconds left on the clock, `0.0` when no clock runs.
    pub fn time_left(&self, now: Instant) -> f64 {
        self.deadline
            .map_or(0.0, |d| d.remaining(now).as_secs_f64())
    }

    /// The state as `viewer` may see it.
    ///
    /// The word goes to the drawer of an active turn, and to everyone once
    /// the game is over.
    pub fn view_for(&self, viewer: &str, now: Instant) -> GameStateView {
        let word_visible = match self.phase {
            Phase::GameOver => true,
            Phase::DrawerPreparing | Phase::Drawing => self.drawer.as_deref() == Some(viewer),
            Phase::PreRound => false,
        };
        GameStateView {
            round: self.round,
            drawer: self.drawer.clone(),
            phase: self.phase,
            timer_end: self.timer_end(),
            time_left: self.time_left(now),
            word: if word_visible { self.word.clone() } else { None },
            word_hints: self.word_hints.clone(),
            correct_guessers: self.correct_guessers.clone(),
            last_drawer: self.last_drawer.clone(),
            last_word: self.last_word.clone(),
            first_guesser: self.first_guesser.clone(),
        }
    }
}
