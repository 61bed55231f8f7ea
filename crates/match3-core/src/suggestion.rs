//! External move suggestions.
//!
//! A suggestion service receives a serialized board and answers with a
//! proposed swap. Responses come from outside the process and are always
//! revalidated before use.

use crate::grid::{Coord, Grid};
use crate::moves::{find_moves, Move};
use crate::strategy::{best_move, StrategyContext};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Board snapshot sent to a suggestion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    /// Colors as `matrix[row][column]`, `-1` for empty cells
    pub color_matrix: Vec<Vec<i32>>,
    pub color_count: u8,
    pub level: usize,
    pub score: u32,
    pub target_score: u32,
    pub moves_used: u32,
    pub move_limit: Option<u32>,
    pub moves_remaining: Option<u32>,
}

impl SuggestionRequest {
    pub fn from_context(grid: &Grid, ctx: &StrategyContext<'_>) -> Self {
        Self {
            color_matrix: grid.color_matrix(),
            color_count: ctx.objective.color_count,
            level: ctx.level,
            score: ctx.score,
            target_score: ctx.objective.target_score,
            moves_used: ctx.moves_used,
            move_limit: ctx.objective.move_limit(),
            moves_remaining: ctx.objective.moves_remaining(ctx.moves_used),
        }
    }

    /// Reject boards larger than `max_columns x max_rows`
    pub fn check_size(&self, max_columns: usize, max_rows: usize) -> Result<(), SuggestionError> {
        let rows = self.color_matrix.len();
        let columns = self.color_matrix.iter().map(Vec::len).max().unwrap_or(0);
        if columns > max_columns || rows > max_rows {
            return Err(SuggestionError::InvalidBoard(format!(
                "{}x{} board exceeds the {}x{} limit",
                columns, rows, max_columns, max_rows
            )));
        }
        Ok(())
    }
}

/// A proposed swap. Coordinates are signed so bad input survives parsing
/// and is rejected by [`SuggestionResponse::validate`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub from_col: i64,
    pub from_row: i64,
    pub to_col: i64,
    pub to_row: i64,
    #[serde(default)]
    pub rationale: String,
}

impl SuggestionResponse {
    pub fn for_move(mv: Move, rationale: impl Into<String>) -> Self {
        Self {
            from_col: mv.from.column as i64,
            from_row: mv.from.row as i64,
            to_col: mv.to.column as i64,
            to_row: mv.to.row as i64,
            rationale: rationale.into(),
        }
    }

    /// Convert to a move on `grid`, checking bounds and adjacency
    pub fn validate(&self, grid: &Grid) -> Result<Move, SuggestionError> {
        let coord = |column: i64, row: i64| -> Option<Coord> {
            let coord = Coord::new(usize::try_from(column).ok()?, usize::try_from(row).ok()?);
            grid.contains(coord).then_some(coord)
        };

        let invalid = || SuggestionError::InvalidMove {
            from: (self.from_col, self.from_row),
            to: (self.to_col, self.to_row),
        };

        let from = coord(self.from_col, self.from_row).ok_or_else(invalid)?;
        let to = coord(self.to_col, self.to_row).ok_or_else(invalid)?;
        let mv = Move::new(from, to);
        if !mv.is_adjacent() {
            return Err(invalid());
        }
        Ok(mv)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SuggestionError {
    #[error("Suggestion service unavailable: {0}")]
    Unavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Suggested move {from:?} -> {to:?} is not a valid swap")]
    InvalidMove { from: (i64, i64), to: (i64, i64) },

    #[error("Board has no available moves")]
    NoMoves,

    #[error("Invalid board: {0}")]
    InvalidBoard(String),
}

pub type SuggestionResult = Result<SuggestionResponse, SuggestionError>;

/// Something that can answer suggestion requests without blocking the caller.
///
/// `request` must return immediately; the answer arrives on the receiver
/// whenever the backing task finishes. Dropping the sender counts as a
/// failed request.
pub trait SuggestionSource: Send + Sync {
    fn request(&mut self, request: SuggestionRequest) -> oneshot::Receiver<SuggestionResult>;
}

/// Answer a suggestion request using the greedy heuristic.
///
/// This is what a suggestion service runs on its side of the wire.
pub fn answer(request: &SuggestionRequest) -> SuggestionResult {
    let mut grid = Grid::from_color_matrix(&request.color_matrix, request.color_count.max(1))
        .map_err(|e| SuggestionError::InvalidBoard(e.to_string()))?;

    let moves = find_moves(&mut grid);
    let (mv, score) = best_move(&grid, &moves).ok_or(SuggestionError::NoMoves)?;

    let mut rationale = format!(
        "Swap ({}, {}) with ({}, {}) for a projected {} points",
        mv.from.column, mv.from.row, mv.to.column, mv.to.row, score
    );
    let needed = request.target_score.saturating_sub(request.score);
    if needed > 0 {
        rationale.push_str(&format!(", {} short of the target", needed));
    }
    if let Some(remaining) = request.moves_remaining {
        rationale.push_str(&format!(" with {} moves left", remaining));
    }

    Ok(SuggestionResponse::for_move(mv, rationale))
}

/// [`answer`] for boards no larger than `max_columns x max_rows`
pub fn answer_within(
    request: &SuggestionRequest,
    max_columns: usize,
    max_rows: usize,
) -> SuggestionResult {
    request.check_size(max_columns, max_rows)?;
    answer(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_adjacent_in_bounds() {
        let grid = Grid::new(4, 4);
        let response = SuggestionResponse {
            from_col: 1,
            from_row: 2,
            to_col: 1,
            to_row: 3,
            rationale: String::new(),
        };
        assert_eq!(
            response.validate(&grid),
            Ok(Move::new(Coord::new(1, 2), Coord::new(1, 3)))
        );
    }

    #[test]
    fn test_validate_rejects_bad_moves() {
        let grid = Grid::new(4, 4);
        let bad = [
            (-1, 0, 0, 0),
            (3, 3, 4, 3),
            (0, 0, 2, 0),
            (0, 0, 1, 1),
            (2, 2, 2, 2),
        ];
        for (fc, fr, tc, tr) in bad {
            let response = SuggestionResponse {
                from_col: fc,
                from_row: fr,
                to_col: tc,
                to_row: tr,
                rationale: String::new(),
            };
            assert!(
                matches!(response.validate(&grid), Err(SuggestionError::InvalidMove { .. })),
                "{:?} should be rejected",
                response
            );
        }
    }

    #[test]
    fn test_response_parses_without_rationale() {
        let response: SuggestionResponse =
            serde_json::from_str(r#"{"from_col":0,"from_row":0,"to_col":1,"to_row":0}"#).unwrap();
        assert_eq!(response.rationale, "");
    }

    #[test]
    fn test_answer_picks_a_real_move() {
        let request = SuggestionRequest {
            color_matrix: vec![vec![0, 0, 1], vec![2, 3, 0], vec![1, 2, 3]],
            color_count: 4,
            level: 1,
            score: 10,
            target_score: 50,
            moves_used: 2,
            move_limit: Some(10),
            moves_remaining: Some(8),
        };
        let response = answer(&request).unwrap();
        let grid = Grid::from_color_matrix(&request.color_matrix, 4).unwrap();
        let mv = response.validate(&grid).unwrap();
        assert!(mv.same_cells(&Move::new(Coord::new(2, 0), Coord::new(2, 1))));
        assert!(response.rationale.contains("40 short"));
        assert!(response.rationale.contains("8 moves left"));
    }

    #[test]
    fn test_answer_errors() {
        let mut request = SuggestionRequest {
            color_matrix: vec![vec![0, 1, 2], vec![1, 2, 0], vec![2, 0, 1]],
            color_count: 3,
            level: 1,
            score: 0,
            target_score: 50,
            moves_used: 0,
            move_limit: None,
            moves_remaining: None,
        };
        assert_eq!(answer(&request), Err(SuggestionError::NoMoves));

        request.color_matrix = vec![vec![0, 1], vec![1]];
        assert!(matches!(answer(&request), Err(SuggestionError::InvalidBoard(_))));
    }

    #[test]
    fn test_oversized_board_rejected_before_search() {
        let mut request = SuggestionRequest {
            color_matrix: vec![vec![0, 0, 1], vec![2, 3, 0], vec![1, 2, 3]],
            color_count: 4,
            level: 1,
            score: 0,
            target_score: 50,
            moves_used: 0,
            move_limit: None,
            moves_remaining: None,
        };
        assert!(answer_within(&request, 3, 3).is_ok());
        assert!(matches!(
            answer_within(&request, 2, 3),
            Err(SuggestionError::InvalidBoard(_))
        ));

        request.color_matrix = (0..160)
            .map(|r| (0..160).map(|c| ((c + 2 * r) % 4) as i32).collect())
            .collect();
        match answer_within(&request, 8, 8) {
            Err(SuggestionError::InvalidBoard(message)) => {
                assert_eq!(message, "160x160 board exceeds the 8x8 limit")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
