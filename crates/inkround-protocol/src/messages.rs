//! Inbound client messages and outbound server events.
//!
//! Every frame on the wire is a JSON object `{"type": "...", "payload": ...}`.
//! Outbound events derive their shape directly through serde's adjacent
//! tagging. Inbound messages go through [`WireFrame`] first: clients are
//! loose about payloads (`{}`, `null` or absent for payload-less
//! messages), so the type tag is matched by hand and only the payloads
//! that carry data are parsed strictly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    ConfigPatch, GameConfig, GameStateView, GameType, PlayerSummary, ProtocolError, RoomId,
    RoomStatus, Stroke, TurnResult,
};

/// Nickname used when a `JOIN` omits one.
pub const DEFAULT_NICKNAME: &str = "Anonymous";

// ---------------------------------------------------------------------------
// WireFrame: the untyped envelope
// ---------------------------------------------------------------------------

/// A frame with its type tag read but its payload still raw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl WireFrame {
    fn new(kind: &str, payload: Value) -> Self {
        Self {
            kind: kind.to_string(),
            payload,
        }
    }

    fn empty(kind: &str) -> Self {
        Self::new(kind, Value::Object(Map::new()))
    }

    /// Parses the payload as `T`, treating `null`/absent as `{}`.
    fn payload<T: serde::de::DeserializeOwned>(self) -> Result<T, ProtocolError> {
        let payload = match self.payload {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        serde_json::from_value(payload).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// Everything a client can ask of its room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireFrame", into = "WireFrame")]
pub enum ClientMessage {
    /// Claim a nickname in the room (new player or reconnection).
    Join {
        nickname: String,
        password: Option<String>,
        token: Option<String>,
    },
    ToggleReady { is_ready: bool },
    /// Host only, lobby only.
    UpdateConfig { config: ConfigPatch },
    /// Host only.
    StartGame,
    /// A guess while drawing, plain conversation otherwise.
    Chat { text: String },
    DrawStroke { stroke: Stroke },
    UndoStroke,
    /// Starts the clock for the prepared turn.
    StartRound,
    ClearCanvas,
    LeaveRoom,
    /// Host only. Ends any game and reopens the lobby.
    ReturnToLobby,
    /// Host only.
    CloseRoom,
}

#[derive(Deserialize)]
struct JoinPayload {
    #[serde(default = "default_nickname")]
    nickname: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

fn default_nickname() -> String {
    DEFAULT_NICKNAME.to_string()
}

#[derive(Deserialize)]
struct ReadyPayload {
    #[serde(default)]
    is_ready: bool,
}

#[derive(Deserialize)]
struct ConfigPayload {
    #[serde(default)]
    config: ConfigPatch,
}

#[derive(Deserialize)]
struct ChatPayload {
    text: String,
}

impl TryFrom<WireFrame> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(frame: WireFrame) -> Result<Self, Self::Error> {
        let msg = match frame.kind.as_str() {
            "JOIN" => {
                let p: JoinPayload = frame.payload()?;
                Self::Join {
                    nickname: p.nickname,
                    password: p.password,
                    token: p.token,
                }
            }
            "TOGGLE_READY" => {
                let p: ReadyPayload = frame.payload()?;
                Self::ToggleReady {
                    is_ready: p.is_ready,
                }
            }
            "UPDATE_CONFIG" => {
                let p: ConfigPayload = frame.payload()?;
                Self::UpdateConfig { config: p.config }
            }
            "START_GAME" => Self::StartGame,
            "CHAT" => {
                let p: ChatPayload = frame.payload()?;
                Self::Chat { text: p.text }
            }
            "DRAW_STROKE" => Self::DrawStroke {
                stroke: frame.payload()?,
            },
            "UNDO_STROKE" => Self::UndoStroke,
            "START_ROUND" | "START_ACTIVE_ROUND" => Self::StartRound,
            "CLEAR_CANVAS" => Self::ClearCanvas,
            "LEAVE_ROOM" => Self::LeaveRoom,
            "RETURN_TO_LOBBY" => Self::ReturnToLobby,
            "CLOSE_ROOM" => Self::CloseRoom,
            other => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "unknown message type {other:?}"
                )));
            }
        };
        Ok(msg)
    }
}

impl From<ClientMessage> for WireFrame {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Join {
                nickname,
                password,
                token,
            } => Self::new(
                "JOIN",
                serde_json::json!({
                    "nickname": nickname,
                    "password": password,
                    "token": token,
                }),
            ),
            ClientMessage::ToggleReady { is_ready } => {
                Self::new("TOGGLE_READY", serde_json::json!({ "is_ready": is_ready }))
            }
            ClientMessage::UpdateConfig { config } => Self::new(
                "UPDATE_CONFIG",
                serde_json::json!({ "config": serde_json::to_value(config).unwrap_or_default() }),
            ),
            ClientMessage::StartGame => Self::empty("START_GAME"),
            ClientMessage::Chat { text } => Self::new("CHAT", serde_json::json!({ "text": text })),
            ClientMessage::DrawStroke { stroke } => {
                Self::new("DRAW_STROKE", Value::Object(stroke.fields().clone()))
            }
            ClientMessage::UndoStroke => Self::empty("UNDO_STROKE"),
            ClientMessage::StartRound => Self::empty("START_ROUND"),
            ClientMessage::ClearCanvas => Self::empty("CLEAR_CANVAS"),
            ClientMessage::LeaveRoom => Self::empty("LEAVE_ROOM"),
            ClientMessage::ReturnToLobby => Self::empty("RETURN_TO_LOBBY"),
            ClientMessage::CloseRoom => Self::empty("CLOSE_ROOM"),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Everything the server pushes to clients.
///
/// `#[serde(tag = "type", content = "payload")]` produces
/// `{"type": "CHAT", "payload": {"sender": ..., ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    /// Sent only to the joining connection.
    JoinSuccess {
        room_id: RoomId,
        nickname: String,
        is_host: bool,
        /// Connected players, in join order.
        players: Vec<PlayerSummary>,
        state: RoomStatus,
        game_type: GameType,
        config: GameConfig,
        /// Lets this client rejoin later without re-entering the password.
        token: String,
    },

    Error { message: String },

    PlayerJoined {
        nickname: String,
        is_ready: bool,
        color: String,
        total_players: usize,
    },

    PlayerReconnected { nickname: String },

    PlayerUpdate { nickname: String, is_ready: bool },

    ConfigUpdate { config: GameConfig },

    /// A chat line. `sender` is `"System"` for announcements.
    Chat {
        sender: String,
        color: String,
        text: String,
    },

    /// One incremental stroke, relayed to everyone but its author.
    DrawStroke(Stroke),

    /// The full stroke history, after an undo or for a catching-up client.
    StrokeHistoryUpdate { history: Vec<Stroke> },

    ClearCanvas {},

    /// Viewer-specific game snapshot.
    GameStateUpdate {
        game_state: GameStateView,
        scores: BTreeMap<String, u32>,
        turn_results: BTreeMap<String, TurnResult>,
    },

    PlayerDisconnected { nickname: String },

    PlayerLeft { nickname: String },

    /// The room is back in the lobby: scores zeroed, nobody ready.
    ReturnedToLobby {
        players: Vec<PlayerSummary>,
        config: GameConfig,
    },

    /// Confirms an explicit leave to the leaver.
    LeftRoom {},

    RoomClosed {},
}
