//! Level objectives.
//!
//! Every level asks for a target score under an optional constraint, and
//! picks how many palette colors the random generator draws from.

use serde::{Deserialize, Serialize};

/// Limit that ends a level if it runs out before the target is reached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Play until the target is reached or no moves remain
    Unlimited,
    /// Session clock may not reach this many seconds
    TimeLimit { seconds: f64 },
    /// No more than this many committed moves
    MoveLimit { moves: u32 },
}

/// Goal for a single level tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    pub description: String,
    pub target_score: u32,
    pub constraint: Constraint,
    /// Number of palette colors in play
    pub color_count: u8,
}

impl Objective {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        target_score: u32,
        constraint: Constraint,
        color_count: u8,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            target_score,
            constraint,
            color_count,
        }
    }

    /// Check if the score meets the target
    pub fn is_met(&self, score: u32) -> bool {
        score >= self.target_score
    }

    /// Check if the level's constraint has run out
    pub fn is_exceeded(&self, moves_used: u32, elapsed_seconds: f64) -> bool {
        match self.constraint {
            Constraint::Unlimited => false,
            Constraint::TimeLimit { seconds } => elapsed_seconds >= seconds,
            Constraint::MoveLimit { moves } => moves_used >= moves,
        }
    }

    pub fn move_limit(&self) -> Option<u32> {
        match self.constraint {
            Constraint::MoveLimit { moves } => Some(moves),
            _ => None,
        }
    }

    pub fn time_limit(&self) -> Option<f64> {
        match self.constraint {
            Constraint::TimeLimit { seconds } => Some(seconds),
            _ => None,
        }
    }

    pub fn moves_remaining(&self, moves_used: u32) -> Option<u32> {
        self.move_limit().map(|limit| limit.saturating_sub(moves_used))
    }

    pub fn time_remaining(&self, elapsed_seconds: f64) -> Option<f64> {
        self.time_limit().map(|limit| (limit - elapsed_seconds).max(0.0))
    }
}

/// The built-in level table
pub fn default_levels() -> Vec<Objective> {
    vec![
        Objective::new(
            "Level 1: Beginner",
            "Score 50 points",
            50,
            Constraint::Unlimited,
            5,
        ),
        Objective::new(
            "Level 2: Intermediate",
            "Score 100 points in 3 minutes",
            100,
            Constraint::TimeLimit { seconds: 180.0 },
            4,
        ),
        Objective::new(
            "Level 3: Expert",
            "Score 200 points in 2 minutes",
            200,
            Constraint::TimeLimit { seconds: 120.0 },
            3,
        ),
        Objective::new(
            "Level 4: Tactician",
            "Score 120 points in 25 moves",
            120,
            Constraint::MoveLimit { moves: 25 },
            4,
        ),
    ]
}
