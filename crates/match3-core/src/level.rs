//! Level generation.
//!
//! Grids are produced by rejection sampling: fill randomly, resolve every
//! cascade, and start over if the settled board has no moves.

use crate::cascade::resolve_fully;
use crate::grid::{Grid, PreviewQueue};
use crate::moves::find_moves;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GenerationError {
    #[error("Level has no colors to draw from")]
    NoColors,

    #[error("No playable grid found after {attempts} attempts")]
    Exhausted { attempts: usize },
}

/// Parameters for one generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    pub columns: usize,
    pub rows: usize,
    pub preview_rows: usize,
    pub color_count: u8,
    pub max_attempts: usize,
    pub max_cascade_waves: usize,
}

/// A freshly generated, settled board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLevel {
    pub grid: Grid,
    pub preview: PreviewQueue,
    /// Attempts it took, starting at 1
    pub attempts: usize,
}

/// Generate a cluster-free grid with at least one available move
pub fn generate_level<R: Rng + ?Sized>(
    spec: &LevelSpec,
    rng: &mut R,
) -> Result<GeneratedLevel, GenerationError> {
    if spec.color_count == 0 {
        return Err(GenerationError::NoColors);
    }

    let mut preview = PreviewQueue::new(spec.columns, spec.preview_rows, spec.color_count, rng);
    let mut grid = Grid::new(spec.columns, spec.rows);

    for attempt in 1..=spec.max_attempts {
        grid.fill_random(spec.color_count, rng);

        if let Err(e) = resolve_fully(&mut grid, &mut preview, rng, spec.max_cascade_waves) {
            debug!(attempt, error = %e, "Discarding unsettled grid");
            continue;
        }

        if !find_moves(&mut grid).is_empty() {
            debug!(attempt, "Generated level");
            return Ok(GeneratedLevel {
                grid,
                preview,
                attempts: attempt,
            });
        }
    }

    Err(GenerationError::Exhausted {
        attempts: spec.max_attempts,
    })
}
