//! Game-facing wire types: phases, strokes, scoreboards, and the
//! per-viewer game state snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{GameType, RoomId, RoomStatus};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Turn state machine phase.
///
/// ```text
/// PreRound → DrawerPreparing → Drawing ─┐
///                  ↑                    │ (end_round → next_turn)
///                  └────────────────────┘
///        any of the above ──→ GameOver (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Game started, no turn dealt yet.
    #[default]
    PreRound,
    /// Word chosen; the drawer has not started the clock.
    DrawerPreparing,
    /// Clock running, guesses accepted.
    Drawing,
    /// Terminal.
    GameOver,
}

impl Phase {
    /// Phases in which a drawer is assigned and may touch the canvas.
    pub fn has_active_drawer(&self) -> bool {
        matches!(self, Self::DrawerPreparing | Self::Drawing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreRound => write!(f, "PRE_ROUND"),
            Self::DrawerPreparing => write!(f, "DRAWER_PREPARING"),
            Self::Drawing => write!(f, "DRAWING"),
            Self::GameOver => write!(f, "GAME_OVER"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stroke
// ---------------------------------------------------------------------------

/// One drawing action, opaque to the server apart from its `actionId`.
///
/// Clients send a JSON object (coordinates, color, width, ...). Strokes
/// that share an `actionId` belong to one pointer gesture and are undone
/// together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stroke(Map<String, Value>);

impl Stroke {
    /// Wraps a raw stroke object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// A stroke with only an `actionId` field; handy for tests and demos.
    pub fn with_action_id(action_id: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("actionId".to_string(), action_id.into());
        Self(fields)
    }

    /// The grouping key, if present and not blank.
    ///
    /// `null` and `""` count as absent.
    pub fn action_id(&self) -> Option<&Value> {
        match self.0.get("actionId") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(v),
        }
    }

    /// The raw stroke object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Scoreboard & state snapshot
// ---------------------------------------------------------------------------

/// Points earned by one player in the current turn, before they are
/// committed to the persistent score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub points: u32,
    /// Seconds from the start of the drawing phase to the guess, rounded
    /// to a tenth.
    #[serde(rename = "time")]
    pub time_taken: f64,
}

/// The game state as one particular viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    pub round: u32,
    pub drawer: Option<String>,
    pub phase: Phase,
    /// Unix time (seconds) at which the drawing phase ends; `0.0` when unset.
    pub timer_end: f64,
    /// Seconds remaining in the drawing phase; `0.0` when unset.
    pub time_left: f64,
    /// The secret word; `None` unless this viewer may see it.
    pub word: Option<String>,
    pub word_hints: String,
    pub correct_guessers: Vec<String>,
    pub last_drawer: Option<String>,
    pub last_word: Option<String>,
    #[serde(rename = "first_guesser_nickname")]
    pub first_guesser: Option<String>,
}

/// A roster entry as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub nickname: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub connected: bool,
    pub color: String,
    pub score: u32,
}

/// A room as listed by the room browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListing {
    pub id: RoomId,
    pub name: String,
    pub game_type: GameType,
    pub has_password: bool,
    /// Connected players only.
    pub players_count: usize,
    pub state: RoomStatus,
}
