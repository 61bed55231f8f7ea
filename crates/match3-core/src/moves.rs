//! Move discovery.

use crate::cluster::has_clusters;
use crate::grid::{Coord, Grid};
use serde::{Deserialize, Serialize};

/// A swap of two adjacent tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Coord,
    pub to: Coord,
}

impl Move {
    pub const fn new(from: Coord, to: Coord) -> Self {
        Self { from, to }
    }

    /// Check if the two endpoints are orthogonal neighbours
    pub fn is_adjacent(&self) -> bool {
        self.from.is_adjacent(&self.to)
    }

    /// Check if both endpoints lie on the grid
    pub fn in_bounds(&self, grid: &Grid) -> bool {
        grid.contains(self.from) && grid.contains(self.to)
    }

    /// Same pair of cells, in either order
    pub fn same_cells(&self, other: &Move) -> bool {
        (self.from == other.from && self.to == other.to)
            || (self.from == other.to && self.to == other.from)
    }
}

/// Whether two cells may be swapped at all
pub fn can_swap(a: Coord, b: Coord) -> bool {
    a.is_adjacent(&b)
}

/// Check if swapping two cells would create at least one cluster.
///
/// The grid is restored before returning.
pub fn creates_cluster(grid: &mut Grid, mv: Move) -> bool {
    grid.swap(mv.from, mv.to);
    let found = has_clusters(grid);
    grid.swap(mv.from, mv.to);
    found
}

/// Find every adjacent swap that would produce a cluster.
///
/// Horizontal pairs are probed row by row, then vertical pairs column by
/// column. Each probe swaps, scans, and swaps back, leaving the grid as it
/// was found.
pub fn find_moves(grid: &mut Grid) -> Vec<Move> {
    let mut moves = Vec::new();

    for row in 0..grid.rows() {
        for column in 0..grid.columns().saturating_sub(1) {
            let mv = Move::new(Coord::new(column, row), Coord::new(column + 1, row));
            if creates_cluster(grid, mv) {
                moves.push(mv);
            }
        }
    }

    for column in 0..grid.columns() {
        for row in 0..grid.rows().saturating_sub(1) {
            let mv = Move::new(Coord::new(column, row), Coord::new(column, row + 1));
            if creates_cluster(grid, mv) {
                moves.push(mv);
            }
        }
    }

    moves
}
