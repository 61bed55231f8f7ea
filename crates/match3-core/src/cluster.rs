//! Match detection.
//!
//! A cluster is a run of three or more same-colored tiles along a single
//! axis. Horizontal and vertical runs are reported independently, so an
//! L or T shape yields two clusters sharing a cell.

use crate::grid::{Color, Coord, Grid};
use serde::{Deserialize, Serialize};

/// Minimum run length that counts as a match
pub const MIN_CLUSTER_LENGTH: usize = 3;

/// Axis a cluster runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A run of matching tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cluster {
    /// Anchor cell: leftmost for horizontal runs, topmost for vertical ones
    pub start: Coord,
    pub length: usize,
    pub orientation: Orientation,
}

impl Cluster {
    pub fn horizontal(column: usize, row: usize, length: usize) -> Self {
        Self {
            start: Coord::new(column, row),
            length,
            orientation: Orientation::Horizontal,
        }
    }

    pub fn vertical(column: usize, row: usize, length: usize) -> Self {
        Self {
            start: Coord::new(column, row),
            length,
            orientation: Orientation::Vertical,
        }
    }

    /// Cells covered by this cluster, anchor first
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.length).map(move |i| match self.orientation {
            Orientation::Horizontal => Coord::new(self.start.column + i, self.start.row),
            Orientation::Vertical => Coord::new(self.start.column, self.start.row + i),
        })
    }

    /// Check if this cluster covers a cell
    pub fn contains(&self, coord: Coord) -> bool {
        match self.orientation {
            Orientation::Horizontal => {
                coord.row == self.start.row
                    && (self.start.column..self.start.column + self.length).contains(&coord.column)
            }
            Orientation::Vertical => {
                coord.column == self.start.column
                    && (self.start.row..self.start.row + self.length).contains(&coord.row)
            }
        }
    }
}

/// Find every horizontal then every vertical cluster on the grid.
///
/// Rows are scanned top to bottom, then columns left to right; the result
/// order is stable for a given grid.
pub fn find_clusters(grid: &Grid) -> Vec<Cluster> {
    let mut clusters = Vec::new();

    for row in 0..grid.rows() {
        scan_line(grid.columns(), |i| grid.color(Coord::new(i, row)), |start, length| {
            clusters.push(Cluster::horizontal(start, row, length));
        });
    }

    for column in 0..grid.columns() {
        scan_line(grid.rows(), |i| grid.color(Coord::new(column, i)), |start, length| {
            clusters.push(Cluster::vertical(column, start, length));
        });
    }

    clusters
}

/// Check for any cluster without collecting them
pub fn has_clusters(grid: &Grid) -> bool {
    !find_clusters(grid).is_empty()
}

/// Walk one line, reporting `(start, length)` for every qualifying run
fn scan_line<C, E>(len: usize, color_at: C, mut emit: E)
where
    C: Fn(usize) -> Option<Color>,
    E: FnMut(usize, usize),
{
    let mut run = 1;
    for i in 0..len {
        let continues = i + 1 < len && {
            let current = color_at(i);
            current.is_some() && current == color_at(i + 1)
        };

        if continues {
            run += 1;
        } else {
            if run >= MIN_CLUSTER_LENGTH {
                emit(i + 1 - run, run);
            }
            run = 1;
        }
    }
}
