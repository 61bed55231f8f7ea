//! Events emitted by the session state machine.
//!
//! Every state-changing call returns the events it produced so callers can
//! forward them to a renderer or over the wire.

use crate::cascade::ScoreDelta;
use crate::cluster::Cluster;
use crate::grid::Coord;
use crate::moves::Move;
use serde::{Deserialize, Serialize};

/// Why a level ended without reaching its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    MoveLimit,
    TimeLimit,
    NoMoves,
}

/// Result of the current level attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    InProgress,
    LevelComplete,
    GameOver(GameOverReason),
}

impl Outcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A fresh grid was generated
    NewGame { level: usize, attempts: usize },

    TileSelected { coord: Coord },

    SelectionCleared,

    /// Swap animation began; the grid is not changed yet
    SwapStarted { swap: Move },

    /// Swap applied and produced matches
    SwapCommitted { swap: Move, clusters: usize },

    /// Swap produced no match and is animating back
    SwapRejected { swap: Move },

    /// Rejected swap undone
    SwapReverted { swap: Move },

    ClustersRemoved {
        clusters: Vec<Cluster>,
        delta: ScoreDelta,
    },

    /// Tiles fell and `added` new tiles entered from the preview queue
    TilesShifted { added: usize },

    /// Board is stable and accepting moves again
    Settled { moves_available: usize },

    LevelCompleted { score: u32, time: f64 },

    GameOver { reason: GameOverReason, score: u32 },
}
