//! Automated move selection.
//!
//! This module provides the bot strategies:
//! - Random: uniform pick among available moves
//! - Greedy: highest projected score for the next swap
//! - Suggestion: asks an external service, one request at a time

use crate::cascade::cluster_points;
use crate::cluster::find_clusters;
use crate::grid::Grid;
use crate::moves::Move;
use crate::objective::Objective;
use crate::suggestion::{SuggestionRequest, SuggestionResult, SuggestionSource};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, warn};

/// Built-in strategy kinds, for toggles and wire messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    Random,
    Greedy,
    Suggestion,
}

/// What a strategy may know about the session besides the grid
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub level: usize,
    pub objective: &'a Objective,
    pub score: u32,
    pub moves_used: u32,
    /// Changes every time the board settles; identifies the board a request was made for
    pub generation: u64,
}

/// A bot policy that picks one of the available moves
pub trait MoveStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Choose a move, or `None` to skip this activation.
    ///
    /// Only called while the session is `Ready` and still in progress.
    fn select_move(
        &mut self,
        grid: &Grid,
        moves: &[Move],
        ctx: &StrategyContext<'_>,
    ) -> Option<Move>;
}

/// Heuristic value of a cluster for move ranking
pub fn cluster_value(length: usize) -> u32 {
    let bonus = match length {
        0..=3 => 0,
        4 => 5,
        _ => 10,
    };
    cluster_points(length) + bonus
}

/// Projected value of the clusters a swap would create
pub fn projected_score(grid: &mut Grid, mv: Move) -> u32 {
    grid.swap(mv.from, mv.to);
    let score = find_clusters(grid)
        .iter()
        .map(|c| cluster_value(c.length))
        .sum();
    grid.swap(mv.from, mv.to);
    score
}

/// Highest-scoring move with its score; earliest wins ties
pub fn best_move(grid: &Grid, moves: &[Move]) -> Option<(Move, u32)> {
    let mut probe = grid.clone();
    let mut best: Option<(Move, u32)> = None;

    for &mv in moves {
        let score = projected_score(&mut probe, mv);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((mv, score));
        }
    }

    best
}

/// Picks uniformly among available moves
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveStrategy for RandomStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Random
    }

    fn select_move(&mut self, _grid: &Grid, moves: &[Move], _ctx: &StrategyContext<'_>) -> Option<Move> {
        moves.choose(&mut self.rng).copied()
    }
}

/// Picks the move with the best projected score
pub struct GreedyStrategy {
    rng: StdRng,
}

impl GreedyStrategy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for GreedyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveStrategy for GreedyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Greedy
    }

    fn select_move(&mut self, grid: &Grid, moves: &[Move], _ctx: &StrategyContext<'_>) -> Option<Move> {
        match best_move(grid, moves) {
            Some((mv, score)) if score > 0 => Some(mv),
            _ => moves.choose(&mut self.rng).copied(),
        }
    }
}

struct PendingSuggestion {
    receiver: oneshot::Receiver<SuggestionResult>,
    generation: u64,
}

/// Delegates to an external [`SuggestionSource`].
///
/// The first activation issues a request and returns `None`. Later
/// activations poll the outstanding request; no second request is issued
/// while one is in flight. Answers for an older board are dropped.
pub struct SuggestionStrategy {
    source: Box<dyn SuggestionSource>,
    pending: Option<PendingSuggestion>,
}

impl SuggestionStrategy {
    pub fn new(source: Box<dyn SuggestionSource>) -> Self {
        Self {
            source,
            pending: None,
        }
    }

    /// Check if a request is still outstanding
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn poll_pending(&mut self, grid: &Grid, ctx: &StrategyContext<'_>) -> Option<Option<Move>> {
        let pending = self.pending.as_mut()?;

        let result = match pending.receiver.try_recv() {
            Err(TryRecvError::Empty) => return Some(None),
            Err(TryRecvError::Closed) => {
                warn!("Suggestion request dropped without an answer");
                self.pending = None;
                return Some(None);
            }
            Ok(result) => result,
        };

        let generation = pending.generation;
        self.pending = None;

        if generation != ctx.generation {
            debug!(
                requested = generation,
                current = ctx.generation,
                "Discarding stale suggestion"
            );
            return Some(None);
        }

        match result.and_then(|response| response.validate(grid)) {
            Ok(mv) => Some(Some(mv)),
            Err(e) => {
                warn!(error = %e, "Discarding suggestion");
                Some(None)
            }
        }
    }
}

impl MoveStrategy for SuggestionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Suggestion
    }

    fn select_move(&mut self, grid: &Grid, moves: &[Move], ctx: &StrategyContext<'_>) -> Option<Move> {
        if let Some(answer) = self.poll_pending(grid, ctx) {
            return answer;
        }
        if moves.is_empty() {
            return None;
        }

        let request = SuggestionRequest::from_context(grid, ctx);
        let receiver = self.source.request(request);
        self.pending = Some(PendingSuggestion {
            receiver,
            generation: ctx.generation,
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Coord;
    use crate::moves::find_moves;
    use crate::objective::Constraint;
    use crate::suggestion::{SuggestionError, SuggestionResponse};
    use std::sync::{Arc, Mutex};

    fn objective() -> Objective {
        Objective::new("Test", "", 100, Constraint::MoveLimit { moves: 10 }, 5)
    }

    fn ctx(objective: &Objective, generation: u64) -> StrategyContext<'_> {
        StrategyContext {
            level: 1,
            objective,
            score: 0,
            moves_used: 0,
            generation,
        }
    }

    /// Swapping (3,2)/(3,3) makes a 3-run of 1s; (2,1)/(2,2) makes a 5-run of 0s
    fn two_move_grid() -> Grid {
        Grid::from_rows(&[
            [2, 3, 4, 2, 3, 4, 2],
            [0, 0, 2, 0, 0, 3, 4],
            [3, 4, 0, 3, 1, 1, 2],
            [4, 2, 3, 1, 4, 2, 3],
        ])
    }

    #[test]
    fn test_cluster_value_bonus() {
        assert_eq!(cluster_value(3), 3);
        assert_eq!(cluster_value(4), 11);
        assert_eq!(cluster_value(5), 19);
        assert_eq!(cluster_value(6), 22);
    }

    #[test]
    fn test_greedy_prefers_longer_match() {
        let grid = two_move_grid();
        let five = Move::new(Coord::new(2, 1), Coord::new(2, 2));
        let three = Move::new(Coord::new(3, 2), Coord::new(3, 3));

        let mut probe = grid.clone();
        assert_eq!(projected_score(&mut probe, three), 3);
        assert_eq!(projected_score(&mut probe, five), 19);
        assert_eq!(probe, grid);

        let objective = objective();
        let mut greedy = GreedyStrategy::with_seed(1);
        let chosen = greedy.select_move(&grid, &[three, five], &ctx(&objective, 0));
        assert_eq!(chosen, Some(five));
    }

    #[test]
    fn test_greedy_over_all_available_moves() {
        let mut grid = two_move_grid();
        let moves = find_moves(&mut grid);
        let five = Move::new(Coord::new(2, 1), Coord::new(2, 2));
        assert!(moves.iter().any(|m| m.same_cells(&five)));

        let objective = objective();
        let mut greedy = GreedyStrategy::with_seed(1);
        let chosen = greedy.select_move(&grid, &moves, &ctx(&objective, 0)).unwrap();
        assert!(chosen.same_cells(&five));
    }

    #[test]
    fn test_greedy_ties_go_to_first_seen() {
        let grid = two_move_grid();
        let three = Move::new(Coord::new(3, 2), Coord::new(3, 3));
        let moves = [three, three];
        assert_eq!(best_move(&grid, &moves), Some((three, 3)));
    }

    #[test]
    fn test_random_picks_from_moves() {
        let mut grid = two_move_grid();
        let moves = find_moves(&mut grid);
        let objective = objective();
        let mut random = RandomStrategy::with_seed(42);
        for _ in 0..10 {
            let mv = random.select_move(&grid, &moves, &ctx(&objective, 0)).unwrap();
            assert!(moves.contains(&mv));
        }
        assert_eq!(random.select_move(&grid, &[], &ctx(&objective, 0)), None);
    }

    /// Hands out receivers and keeps the senders for the test to answer
    #[derive(Clone, Default)]
    struct ManualSource {
        senders: Arc<Mutex<Vec<oneshot::Sender<SuggestionResult>>>>,
        requests: Arc<Mutex<Vec<SuggestionRequest>>>,
    }

    impl ManualSource {
        fn answer(&self, result: SuggestionResult) {
            let sender = self.senders.lock().unwrap().remove(0);
            sender.send(result).unwrap();
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl SuggestionSource for ManualSource {
        fn request(&mut self, request: SuggestionRequest) -> oneshot::Receiver<SuggestionResult> {
            let (tx, rx) = oneshot::channel();
            self.senders.lock().unwrap().push(tx);
            self.requests.lock().unwrap().push(request);
            rx
        }
    }

    #[test]
    fn test_suggestion_strategy_single_request_in_flight() {
        let mut grid = two_move_grid();
        let moves = find_moves(&mut grid);
        let objective = objective();
        let source = ManualSource::default();
        let mut strategy = SuggestionStrategy::new(Box::new(source.clone()));

        assert_eq!(strategy.select_move(&grid, &moves, &ctx(&objective, 3)), None);
        assert!(strategy.is_pending());
        assert_eq!(strategy.select_move(&grid, &moves, &ctx(&objective, 3)), None);
        assert_eq!(source.request_count(), 1);

        let request = source.requests.lock().unwrap()[0].clone();
        assert_eq!(request.color_matrix, grid.color_matrix());
        assert_eq!(request.moves_remaining, Some(10));

        let suggested = Move::new(Coord::new(2, 1), Coord::new(2, 2));
        source.answer(Ok(SuggestionResponse::for_move(suggested, "best")));
        assert_eq!(
            strategy.select_move(&grid, &moves, &ctx(&objective, 3)),
            Some(suggested)
        );
        assert!(!strategy.is_pending());
    }

    #[test]
    fn test_suggestion_strategy_discards_stale_and_invalid() {
        let mut grid = two_move_grid();
        let moves = find_moves(&mut grid);
        let objective = objective();
        let source = ManualSource::default();
        let mut strategy = SuggestionStrategy::new(Box::new(source.clone()));

        // Answer arrives after the board changed
        strategy.select_move(&grid, &moves, &ctx(&objective, 1));
        source.answer(Ok(SuggestionResponse::for_move(moves[0], "")));
        assert_eq!(strategy.select_move(&grid, &moves, &ctx(&objective, 2)), None);
        assert!(!strategy.is_pending());

        // Out-of-bounds answer
        strategy.select_move(&grid, &moves, &ctx(&objective, 2));
        source.answer(Ok(SuggestionResponse {
            from_col: 6,
            from_row: 0,
            to_col: 7,
            to_row: 0,
            rationale: String::new(),
        }));
        assert_eq!(strategy.select_move(&grid, &moves, &ctx(&objective, 2)), None);

        // Service error
        strategy.select_move(&grid, &moves, &ctx(&objective, 2));
        source.answer(Err(SuggestionError::Transport("reset".into())));
        assert_eq!(strategy.select_move(&grid, &moves, &ctx(&objective, 2)), None);

        // Sender dropped
        strategy.select_move(&grid, &moves, &ctx(&objective, 2));
        source.senders.lock().unwrap().clear();
        assert_eq!(strategy.select_move(&grid, &moves, &ctx(&objective, 2)), None);
        assert!(!strategy.is_pending());
        assert_eq!(source.request_count(), 4);
    }
}
