//! WebSocket protocol messages for match3 sessions.

use match3_core::{Coord, GameEvent, SessionSnapshot, StrategyKind, SuggestionRequest, SuggestionResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Restart on a 1-based level
    NewGame { level: usize },

    /// Click a tile
    SelectTile { column: usize, row: usize },

    /// Drag one tile onto a neighbour
    AttemptSwap { from: Coord, to: Coord },

    ClearSelection,

    /// Enable a bot, or disable it with `None`
    SetBot { kind: Option<StrategyKind> },

    ToggleShowMoves,

    /// Ask for the best move on an arbitrary board
    Suggest { request: SuggestionRequest },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned session ID
    Welcome { session_id: Uuid },

    /// Current view of the session
    Snapshot { snapshot: Box<SessionSnapshot> },

    /// Events produced since the last message
    Events { events: Vec<GameEvent> },

    /// Answer to a `Suggest` request
    Suggestion { result: SuggestionResult },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }
}
