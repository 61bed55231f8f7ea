//! Score and match counters for a session.

use crate::cascade::ScoreDelta;
use crate::grid::Color;
use serde::{Deserialize, Serialize};

/// Monotonic counters for one level attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    /// Committed swaps
    pub move_count: u32,
    pub match3_count: u32,
    pub match4_count: u32,
    pub match5_plus_count: u32,
    pub tiles_cleared: u32,
    /// Session clock reading when the level was completed
    pub completion_time: Option<f64>,
}

impl GameStats {
    pub fn record(&mut self, delta: &ScoreDelta) {
        self.match3_count += delta.match3;
        self.match4_count += delta.match4;
        self.match5_plus_count += delta.match5_plus;
        self.tiles_cleared += delta.tiles_removed as u32;
    }
}

/// Accumulated score per color
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorStats {
    scores: Vec<u32>,
}

impl ColorStats {
    pub fn new(color_count: u8) -> Self {
        Self {
            scores: vec![0; color_count as usize],
        }
    }

    pub fn credit(&mut self, color: Color, points: u32) {
        let idx = color as usize;
        if idx >= self.scores.len() {
            self.scores.resize(idx + 1, 0);
        }
        self.scores[idx] += points;
    }

    pub fn apply(&mut self, delta: &ScoreDelta) {
        for credit in &delta.credits {
            self.credit(credit.color, credit.points);
        }
    }

    pub fn get(&self, color: Color) -> u32 {
        self.scores.get(color as usize).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.scores.iter().sum()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.scores
    }
}
