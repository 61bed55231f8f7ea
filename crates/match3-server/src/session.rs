//! Per-connection game session management.

use match3_core::suggestion::answer_within;
use match3_core::{
    Coord, GameConfig, GameError, GameSession, GreedyStrategy, MoveStrategy, RandomStrategy,
    SessionSnapshot, StrategyKind, SuggestionSource, SuggestionStrategy,
};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::suggest::{LocalSuggestionSource, RemoteSuggestionSource};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Game(#[from] GameError),

    #[error("Session not found")]
    NotFound,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Where suggestion-driven bots get their answers
#[derive(Debug, Clone, Default)]
pub enum SuggestionBackend {
    /// Greedy heuristic on a worker thread
    #[default]
    Local,
    /// A remote suggestion service
    Remote { url: String, timeout: Duration },
}

impl SuggestionBackend {
    pub fn source(&self) -> Box<dyn SuggestionSource> {
        match self {
            SuggestionBackend::Local => Box::new(LocalSuggestionSource),
            SuggestionBackend::Remote { url, timeout } => {
                Box::new(RemoteSuggestionSource::new(url.clone(), *timeout))
            }
        }
    }
}

/// One player's live game.
pub struct PlayerSession {
    pub id: Uuid,
    pub game: GameSession,
    backend: SuggestionBackend,
    /// Last snapshot sent to the client
    last_snapshot: Option<SessionSnapshot>,
}

impl PlayerSession {
    pub fn new(id: Uuid, config: GameConfig, backend: SuggestionBackend) -> Result<Self, SessionError> {
        Ok(Self::with_game(id, GameSession::new(config, 1)?, backend))
    }

    pub fn with_game(id: Uuid, game: GameSession, backend: SuggestionBackend) -> Self {
        Self {
            id,
            game,
            backend,
            last_snapshot: None,
        }
    }

    /// Apply a client message and return the replies
    pub fn handle_message(&mut self, msg: ClientMessage) -> Result<Vec<ServerMessage>, SessionError> {
        let events = match msg {
            ClientMessage::NewGame { level } => self.game.new_game(level)?,
            ClientMessage::SelectTile { column, row } => {
                self.game.select_tile(Coord::new(column, row))?
            }
            ClientMessage::AttemptSwap { from, to } => self.game.attempt_swap(from, to)?,
            ClientMessage::ClearSelection => {
                self.game.clear_selection();
                Vec::new()
            }
            ClientMessage::SetBot { kind } => {
                let bot = kind.map(|kind| self.make_bot(kind));
                self.game.set_bot(bot);
                Vec::new()
            }
            ClientMessage::ToggleShowMoves => {
                self.game.toggle_show_moves();
                Vec::new()
            }
            ClientMessage::Suggest { request } => {
                let config = self.game.config();
                return Ok(vec![ServerMessage::Suggestion {
                    result: answer_within(&request, config.columns, config.rows),
                }]);
            }
            ClientMessage::Ping => return Ok(vec![ServerMessage::Pong]),
        };

        let mut replies = Vec::new();
        if !events.is_empty() {
            replies.push(ServerMessage::Events { events });
        }
        replies.extend(self.snapshot_if_changed());
        Ok(replies)
    }

    /// Advance the game clock and return anything the client should see
    pub fn tick(&mut self, dt: f64) -> Vec<ServerMessage> {
        let events = self.game.tick(dt);

        let mut replies = Vec::new();
        if !events.is_empty() {
            debug!(session = %self.id, count = events.len(), "Tick events");
            replies.push(ServerMessage::Events { events });
        }
        replies.extend(self.snapshot_if_changed());
        replies
    }

    /// Current snapshot, always
    pub fn snapshot(&mut self) -> ServerMessage {
        let snapshot = self.game.snapshot();
        self.last_snapshot = Some(snapshot.clone());
        ServerMessage::Snapshot {
            snapshot: Box::new(snapshot),
        }
    }

    fn snapshot_if_changed(&mut self) -> Option<ServerMessage> {
        let snapshot = self.game.snapshot();
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last_snapshot = Some(snapshot.clone());
        Some(ServerMessage::Snapshot {
            snapshot: Box::new(snapshot),
        })
    }

    fn make_bot(&self, kind: StrategyKind) -> Box<dyn MoveStrategy> {
        match kind {
            StrategyKind::Random => Box::new(RandomStrategy::new()),
            StrategyKind::Greedy => Box::new(GreedyStrategy::new()),
            StrategyKind::Suggestion => Box::new(SuggestionStrategy::new(self.backend.source())),
        }
    }
}
