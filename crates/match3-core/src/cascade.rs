//! Cascade resolution: removing matches, applying gravity, refilling.
//!
//! The state machine calls [`remove_clusters`] and [`shift_tiles`] once per
//! animation step so each wave is visible. Level generation loops them via
//! [`resolve_fully`] until the board is stable.

use crate::cluster::{find_clusters, Cluster, Orientation};
use crate::grid::{Color, Coord, Grid, PreviewQueue};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Points for a cluster of the given length: 3 for 3, 6 for 4, 9 for 5...
pub fn cluster_points(length: usize) -> u32 {
    3 * length.saturating_sub(2) as u32
}

/// Error from [`resolve_fully`] when cascades never stop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Board still had clusters after {waves} cascade waves")]
pub struct UnsettledError {
    pub waves: usize,
}

/// Points credited to one color by one cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCredit {
    pub color: Color,
    pub points: u32,
    pub cluster_length: usize,
}

/// Result of one removal wave
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    /// One entry per credited cluster, in detection order
    pub credits: Vec<ColorCredit>,
    pub match3: u32,
    pub match4: u32,
    pub match5_plus: u32,
    pub tiles_removed: usize,
}

impl ScoreDelta {
    pub fn total_points(&self) -> u32 {
        self.credits.iter().map(|c| c.points).sum()
    }

    fn count_tier(&mut self, length: usize) {
        match length {
            0..=3 => self.match3 += 1,
            4 => self.match4 += 1,
            _ => self.match5_plus += 1,
        }
    }
}

/// Clear every cell covered by `clusters` and compute fall distances.
///
/// Each cluster is credited once, when its anchor cell is visited and still
/// holds a color. A cluster whose anchor was already cleared by an earlier
/// cluster in the same wave earns nothing.
pub fn remove_clusters(grid: &mut Grid, clusters: &[Cluster]) -> ScoreDelta {
    let mut delta = ScoreDelta::default();

    for cluster in clusters {
        delta.count_tier(cluster.length);

        for coord in cluster.cells() {
            let is_anchor = match cluster.orientation {
                Orientation::Horizontal => coord.column == cluster.start.column,
                Orientation::Vertical => coord.row == cluster.start.row,
            };

            if let Some(color) = grid.color(coord) {
                if is_anchor {
                    delta.credits.push(ColorCredit {
                        color,
                        points: cluster_points(cluster.length),
                        cluster_length: cluster.length,
                    });
                }
                delta.tiles_removed += 1;
            }
            grid.set_color(coord, None);
        }
    }

    compute_shifts(grid);
    delta
}

/// Record, for every tile, how many empty slots lie below it
fn compute_shifts(grid: &mut Grid) {
    for column in 0..grid.columns() {
        let mut gap = 0;
        for row in (0..grid.rows()).rev() {
            let cell = grid.cell_mut(Coord::new(column, row));
            if cell.color.is_none() {
                gap += 1;
                cell.shift = 0;
            } else {
                cell.shift = gap;
            }
        }
    }
}

/// Drop tiles by their recorded shift and refill the gaps from the preview queue.
///
/// Returns the number of new tiles that entered the grid.
pub fn shift_tiles<R: Rng + ?Sized>(
    grid: &mut Grid,
    preview: &mut PreviewQueue,
    rng: &mut R,
) -> usize {
    let mut added = 0;

    for column in 0..grid.columns() {
        for row in (0..grid.rows()).rev() {
            let coord = Coord::new(column, row);
            let shift = grid.cell(coord).shift;
            if shift > 0 && !grid.is_empty(coord) {
                grid.swap(coord, coord.down(shift));
            }
            grid.cell_mut(coord).shift = 0;
        }

        let mut needed = 0;
        for row in (0..grid.rows()).rev() {
            let coord = Coord::new(column, row);
            if grid.is_empty(coord) {
                let color = preview.take(column, rng);
                grid.set_color(coord, Some(color));
                needed += 1;
            }
        }

        if needed > 0 {
            preview.replenish(column, rng);
        }
        added += needed;
    }

    added
}

/// Remove and refill until no clusters remain.
///
/// Gives up after `max_waves` waves; a palette of one color never settles.
pub fn resolve_fully<R: Rng + ?Sized>(
    grid: &mut Grid,
    preview: &mut PreviewQueue,
    rng: &mut R,
    max_waves: usize,
) -> Result<usize, UnsettledError> {
    let mut waves = 0;

    loop {
        let clusters = find_clusters(grid);
        if clusters.is_empty() {
            debug!(waves, "Board settled");
            return Ok(waves);
        }
        if waves >= max_waves {
            return Err(UnsettledError { waves });
        }

        remove_clusters(grid, &clusters);
        shift_tiles(grid, preview, rng);
        waves += 1;
    }
}
