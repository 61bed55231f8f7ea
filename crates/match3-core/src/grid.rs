//! Tile grid representation and per-column preview queues.
//!
//! This module contains:
//! - Grid coordinates and cells
//! - The `Grid` tile matrix with swap primitives
//! - The `PreviewQueue` of upcoming colors used for refills
//!
//! Cells are stored column-major, so `(column, row)` with row 0 at the top.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Tile color index into the level's palette
pub type Color = u8;

/// Wire value for an empty cell in color matrices
pub const EMPTY_COLOR: i32 = -1;

/// Errors when building a grid from untrusted data
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GridError {
    #[error("Color matrix has no cells")]
    Empty,

    #[error("Row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid color {value} at column {column}, row {row}")]
    InvalidColor { column: usize, row: usize, value: i32 },
}

/// A position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub column: usize,
    pub row: usize,
}

impl Coord {
    pub const fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }

    /// Whether two coordinates are orthogonal neighbours
    pub fn is_adjacent(&self, other: &Coord) -> bool {
        (self.column.abs_diff(other.column) == 1 && self.row == other.row)
            || (self.row.abs_diff(other.row) == 1 && self.column == other.column)
    }

    /// The coordinate `n` rows further down
    pub fn down(&self, n: usize) -> Coord {
        Coord::new(self.column, self.row + n)
    }
}

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Tile color, `None` while the slot is empty during a cascade
    pub color: Option<Color>,
    /// Rows this tile still has to fall; only meaningful between removal and shift
    pub shift: usize,
}

/// The `columns x rows` tile matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    columns: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell empty
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![Cell::default(); columns * rows],
        }
    }

    /// Build a grid from rows of colors, `rows[row][column]`.
    ///
    /// Intended for fixtures; every row must have the same length.
    pub fn from_rows<R: AsRef<[Color]>>(rows: &[R]) -> Self {
        let columns = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut grid = Grid::new(columns, rows.len());
        for (row, colors) in rows.iter().enumerate() {
            let colors = colors.as_ref();
            assert_eq!(colors.len(), columns, "Row {} has the wrong length", row);
            for (column, &color) in colors.iter().enumerate() {
                grid.set_color(Coord::new(column, row), Some(color));
            }
        }
        grid
    }

    /// Build a grid from an untrusted `matrix[row][column]` of color indices.
    ///
    /// `-1` marks an empty cell; any other negative value, or a color at or
    /// above `color_limit`, is rejected.
    pub fn from_color_matrix(matrix: &[Vec<i32>], color_limit: u8) -> Result<Self, GridError> {
        let columns = matrix.first().map(Vec::len).unwrap_or(0);
        if columns == 0 {
            return Err(GridError::Empty);
        }

        let mut grid = Grid::new(columns, matrix.len());
        for (row, values) in matrix.iter().enumerate() {
            if values.len() != columns {
                return Err(GridError::Ragged {
                    row,
                    expected: columns,
                    found: values.len(),
                });
            }
            for (column, &value) in values.iter().enumerate() {
                let color = match value {
                    EMPTY_COLOR => None,
                    v if (0..color_limit as i32).contains(&v) => Some(v as Color),
                    _ => return Err(GridError::InvalidColor { column, row, value }),
                };
                grid.set_color(Coord::new(column, row), color);
            }
        }
        Ok(grid)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Check if a coordinate lies on the grid
    pub fn contains(&self, coord: Coord) -> bool {
        coord.column < self.columns && coord.row < self.rows
    }

    fn index(&self, coord: Coord) -> usize {
        assert!(
            self.contains(coord),
            "Coordinate ({}, {}) outside {}x{} grid",
            coord.column,
            coord.row,
            self.columns,
            self.rows
        );
        coord.column * self.rows + coord.row
    }

    pub fn cell(&self, coord: Coord) -> &Cell {
        &self.cells[self.index(coord)]
    }

    pub fn cell_mut(&mut self, coord: Coord) -> &mut Cell {
        let idx = self.index(coord);
        &mut self.cells[idx]
    }

    pub fn color(&self, coord: Coord) -> Option<Color> {
        self.cell(coord).color
    }

    pub fn set_color(&mut self, coord: Coord, color: Option<Color>) {
        self.cell_mut(coord).color = color;
    }

    pub fn is_empty(&self, coord: Coord) -> bool {
        self.color(coord).is_none()
    }

    /// Exchange the colors of two cells. No adjacency check.
    pub fn swap(&mut self, a: Coord, b: Coord) {
        let ia = self.index(a);
        let ib = self.index(b);
        let color = self.cells[ia].color;
        self.cells[ia].color = self.cells[ib].color;
        self.cells[ib].color = color;
    }

    /// Every coordinate in column-major order
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.columns).flat_map(move |c| (0..self.rows).map(move |r| Coord::new(c, r)))
    }

    /// Check that no cell is empty
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.color.is_some())
    }

    /// Overwrite every cell with a random color and clear shifts
    pub fn fill_random<R: Rng + ?Sized>(&mut self, color_count: u8, rng: &mut R) {
        for cell in &mut self.cells {
            cell.color = Some(random_color(rng, color_count));
            cell.shift = 0;
        }
    }

    /// Colors as `matrix[row][column]`, `-1` for empty cells
    pub fn color_matrix(&self) -> Vec<Vec<i32>> {
        (0..self.rows)
            .map(|row| {
                (0..self.columns)
                    .map(|column| {
                        self.color(Coord::new(column, row))
                            .map(i32::from)
                            .unwrap_or(EMPTY_COLOR)
                    })
                    .collect()
            })
            .collect()
    }

    /// Pending fall distances as `matrix[row][column]`
    pub fn shift_matrix(&self) -> Vec<Vec<usize>> {
        (0..self.rows)
            .map(|row| {
                (0..self.columns)
                    .map(|column| self.cell(Coord::new(column, row)).shift)
                    .collect()
            })
            .collect()
    }
}

/// Pick a uniformly random color from the first `color_count` palette entries
pub fn random_color<R: Rng + ?Sized>(rng: &mut R, color_count: u8) -> Color {
    rng.gen_range(0..color_count)
}

/// Per-column lookahead of upcoming tile colors.
///
/// The front of each column queue sits nearest the grid and is consumed first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewQueue {
    depth: usize,
    color_count: u8,
    columns: Vec<VecDeque<Color>>,
}

impl PreviewQueue {
    /// Create a queue for `columns` columns, filled to `depth`
    pub fn new<R: Rng + ?Sized>(columns: usize, depth: usize, color_count: u8, rng: &mut R) -> Self {
        let mut queue = Self {
            depth,
            color_count,
            columns: vec![VecDeque::with_capacity(depth); columns],
        };
        queue.refill_all(rng);
        queue
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Queued colors for one column, front first
    pub fn column(&self, column: usize) -> &VecDeque<Color> {
        &self.columns[column]
    }

    /// Take the next color for a column, or a fresh random one if it ran dry
    pub fn take<R: Rng + ?Sized>(&mut self, column: usize, rng: &mut R) -> Color {
        match self.columns[column].pop_front() {
            Some(color) => color,
            None => random_color(rng, self.color_count),
        }
    }

    /// Top a column back up to full depth with new random colors
    pub fn replenish<R: Rng + ?Sized>(&mut self, column: usize, rng: &mut R) {
        let color_count = self.color_count;
        let queue = &mut self.columns[column];
        while queue.len() < self.depth {
            queue.push_back(random_color(rng, color_count));
        }
    }

    /// Discard every queued color and regenerate all columns
    pub fn refill_all<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for column in 0..self.columns.len() {
            self.columns[column].clear();
            self.replenish(column, rng);
        }
    }

    /// Queues as `matrix[column][slot]`, front first
    pub fn to_matrix(&self) -> Vec<Vec<Color>> {
        self.columns
            .iter()
            .map(|q| q.iter().copied().collect())
            .collect()
    }
}
