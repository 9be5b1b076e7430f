//! Per-room game configuration and room lifecycle state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameType / TurnOrder
// ---------------------------------------------------------------------------

/// The kind of game a room hosts. Only drawing rooms exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    #[default]
    Drawing,
}

/// Turn order mode requested by the host.
///
/// Rotation always deals from a shuffled per-round queue; the mode is
/// stored and echoed back so clients can display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOrder {
    #[default]
    Sequence,
    Winner,
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Settings the host can tune while the room is in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Length of a drawing phase in seconds. Never below 1.
    pub round_duration: u32,
    /// A game ends once any score reaches this at a turn boundary.
    pub points_to_win: u32,
    /// Points for the first correct guess; other awards scale from it.
    pub base_points: u32,
    pub turn_order: TurnOrder,
    /// When `false` the host spectates: never draws, never guesses.
    pub host_plays: bool,
    pub word_language: String,
    pub word_difficulty: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_duration: 60,
            points_to_win: 50,
            base_points: 10,
            turn_order: TurnOrder::Sequence,
            host_plays: true,
            word_language: "English".to_string(),
            word_difficulty: "Easy".to_string(),
        }
    }
}

impl GameConfig {
    /// Defaults with `patch` merged on top.
    pub fn merged(patch: Option<&ConfigPatch>) -> Self {
        let mut config = Self::default();
        if let Some(patch) = patch {
            config.apply(patch);
        }
        config
    }

    /// Shallow field-wise merge: every field present in `patch` overwrites
    /// the current value.
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(secs) = patch.round_duration {
            self.round_duration = secs.max(1);
        }
        if let Some(points) = patch.points_to_win {
            self.points_to_win = points;
        }
        if let Some(points) = patch.base_points {
            self.base_points = points;
        }
        if let Some(order) = patch.turn_order {
            self.turn_order = order;
        }
        if let Some(host_plays) = patch.host_plays {
            self.host_plays = host_plays;
        }
        if let Some(language) = &patch.word_language {
            self.word_language = language.clone();
        }
        if let Some(difficulty) = &patch.word_difficulty {
            self.word_difficulty = difficulty.clone();
        }
    }

    /// Drawing phase length as a `Duration`.
    pub fn round_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.round_duration.max(1)))
    }
}

/// A partial [`GameConfig`]; absent fields leave the target untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_to_win: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_order: Option<TurnOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_plays: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_difficulty: Option<String>,
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a room.
///
/// ```text
/// Lobby ──(start_game)──→ Playing ──(return_to_lobby)──→ Lobby
/// ```
///
/// While playing, only reconnecting players may (re)enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Lobby,
    Playing,
}

impl RoomStatus {
    /// Returns `true` if brand-new nicknames may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Playing => write!(f, "playing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default_values() {
        let config = GameConfig::default();
        assert_eq!(config.round_duration, 60);
        assert_eq!(config.points_to_win, 50);
        assert_eq!(config.base_points, 10);
        assert_eq!(config.turn_order, TurnOrder::Sequence);
        assert!(config.host_plays);
        assert_eq!(config.word_language, "English");
        assert_eq!(config.word_difficulty, "Easy");
    }

    #[test]
    fn test_apply_overwrites_only_present_fields() {
        let mut config = GameConfig::default();
        config.apply(&ConfigPatch {
            points_to_win: Some(20),
            host_plays: Some(false),
            ..ConfigPatch::default()
        });
        assert_eq!(config.points_to_win, 20);
        assert!(!config.host_plays);
        assert_eq!(config.round_duration, 60);
        assert_eq!(config.base_points, 10);
    }

    #[test]
    fn test_apply_clamps_zero_round_duration() {
        let mut config = GameConfig::default();
        config.apply(&ConfigPatch {
            round_duration: Some(0),
            ..ConfigPatch::default()
        });
        assert_eq!(config.round_duration, 1);
    }

    #[test]
    fn test_config_patch_parses_partial_json() {
        let patch: ConfigPatch =
            serde_json::from_str(r#"{"round_duration": 90, "turn_order": "winner"}"#).unwrap();
        assert_eq!(patch.round_duration, Some(90));
        assert_eq!(patch.turn_order, Some(TurnOrder::Winner));
        assert_eq!(patch.base_points, None);
    }

    #[test]
    fn test_room_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RoomStatus::Playing).unwrap(), "\"playing\"");
        assert!(RoomStatus::Lobby.is_joinable());
        assert!(!RoomStatus::Playing.is_joinable());
    }
}
