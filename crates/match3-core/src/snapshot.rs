//! Read-only view of a session for renderers and clients.

use crate::cluster::Cluster;
use crate::events::Outcome;
use crate::grid::{Color, Coord};
use crate::moves::Move;
use crate::objective::Objective;
use crate::session::GameSession;
use crate::stats::GameStats;
use crate::strategy::StrategyKind;
use serde::{Deserialize, Serialize};

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub columns: usize,
    pub rows: usize,
    /// `colors[row][column]`, `-1` for empty
    pub colors: Vec<Vec<i32>>,
    /// `preview[column]`, nearest the grid first
    pub preview: Vec<Vec<Color>>,
    /// `shifts[row][column]`, rows each tile is about to fall
    pub shifts: Vec<Vec<usize>>,
    pub clusters: Vec<Cluster>,
    /// Present only when move hints are on and the board is idle
    pub moves: Option<Vec<Move>>,
    pub current_swap: Option<Move>,
    pub selected: Option<Coord>,
    pub phase: String,
    /// Fraction of the current animation elapsed, 0.0 to 1.0
    pub progress: f64,
    pub stats: GameStats,
    pub color_stats: Vec<u32>,
    pub score: u32,
    pub objective: Objective,
    pub level: usize,
    pub time_elapsed: f64,
    pub time_remaining: Option<f64>,
    pub moves_remaining: Option<u32>,
    pub outcome: Outcome,
    pub bot: Option<StrategyKind>,
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn capture(session: &GameSession) -> Self {
        let grid = session.grid();
        let phase = session.phase();
        let objective = session.objective();

        let moves = (session.show_moves() && session.is_ready() && session.clusters().is_empty())
            .then(|| session.moves().to_vec());

        Self {
            columns: grid.columns(),
            rows: grid.rows(),
            colors: grid.color_matrix(),
            preview: session.preview().to_matrix(),
            shifts: grid.shift_matrix(),
            clusters: session.clusters().to_vec(),
            moves,
            current_swap: phase.current_swap(),
            selected: session.selected(),
            phase: phase.name().to_string(),
            progress: session.progress(),
            stats: session.stats().clone(),
            color_stats: session.color_stats().as_slice().to_vec(),
            score: session.score(),
            objective: objective.clone(),
            level: session.level(),
            time_elapsed: session.clock(),
            time_remaining: objective.time_remaining(session.clock()),
            moves_remaining: objective.moves_remaining(session.stats().move_count),
            outcome: session.outcome(),
            bot: session.bot_kind(),
            generation: session.generation(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl GameSession {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self)
    }
}
