//! Game session state machine.
//!
//! A `GameSession` owns the grid, preview queue, scores and timers for one
//! level attempt. It is driven by [`GameSession::tick`] with wall-clock
//! deltas; every animation phase lasts a fixed duration before the next
//! transition fires.
//!
//! ```text
//! Ready --attempt_swap--> SwapAnimating --match--> RemoveAndDetect <--+
//!                              |                        |             |
//!                          no match                 clusters      new clusters
//!                              v                        v             |
//!                        SwapRewinding            ShiftAndRedetect ---+
//!                              |                        |
//!                              +-------> Ready <--- stable
//! ```

use crate::cascade::{remove_clusters, shift_tiles};
use crate::cluster::{find_clusters, Cluster};
use crate::config::{ConfigError, GameConfig};
use crate::events::{GameEvent, GameOverReason, Outcome};
use crate::grid::{Coord, Grid, PreviewQueue};
use crate::level::{generate_level, GenerationError, LevelSpec};
use crate::moves::{can_swap, find_moves, Move};
use crate::objective::{Constraint, Objective};
use crate::stats::{ColorStats, GameStats};
use crate::strategy::{MoveStrategy, StrategyContext, StrategyKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by session entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Board is still animating")]
    NotReady,

    #[error("Level is already finished")]
    Finished,

    #[error("Coordinate ({}, {}) is off the grid", .0.column, .0.row)]
    OutOfBounds(Coord),

    #[error("Tiles are not adjacent")]
    NotAdjacent,

    #[error("No level {0}")]
    UnknownLevel(usize),

    #[error("Grid is {found_columns}x{found_rows}, expected {columns}x{rows}")]
    GridMismatch {
        columns: usize,
        rows: usize,
        found_columns: usize,
        found_rows: usize,
    },

    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Level generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Animation steps of the resolve cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveStep {
    /// Swap sliding into place
    SwapAnimating(Move),
    /// Swap without a match sliding back
    SwapRewinding(Move),
    /// Matched tiles fading out
    RemoveAndDetect,
    /// Tiles falling into the gaps
    ShiftAndRedetect,
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    /// Stable board, accepting moves
    Ready,
    /// Animating; `elapsed` seconds into `step`
    Resolving { step: ResolveStep, elapsed: f64 },
}

impl Phase {
    fn start(step: ResolveStep) -> Self {
        Phase::Resolving { step, elapsed: 0.0 }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Ready => "Ready",
            Phase::Resolving { step, .. } => match step {
                ResolveStep::SwapAnimating(_) => "SwapAnimating",
                ResolveStep::SwapRewinding(_) => "SwapRewinding",
                ResolveStep::RemoveAndDetect => "RemoveAndDetect",
                ResolveStep::ShiftAndRedetect => "ShiftAndRedetect",
            },
        }
    }

    /// The swap being animated, if any
    pub fn current_swap(&self) -> Option<Move> {
        match self {
            Phase::Resolving {
                step: ResolveStep::SwapAnimating(mv) | ResolveStep::SwapRewinding(mv),
                ..
            } => Some(*mv),
            _ => None,
        }
    }
}

/// One level attempt
pub struct GameSession {
    config: GameConfig,
    level: usize,
    objective: Objective,
    grid: Grid,
    preview: PreviewQueue,
    phase: Phase,
    clusters: Vec<Cluster>,
    moves: Vec<Move>,
    stats: GameStats,
    color_stats: ColorStats,
    selected: Option<Coord>,
    show_moves: bool,
    bot: Option<Box<dyn MoveStrategy>>,
    bot_timer: f64,
    clock: f64,
    clock_running: bool,
    outcome: Outcome,
    /// Bumped whenever the board settles or is replaced
    generation: u64,
    rng: StdRng,
}

impl GameSession {
    /// Start a session on the given 1-based level
    pub fn new(config: GameConfig, level: usize) -> Result<Self, GameError> {
        Self::with_rng(config, level, StdRng::from_entropy())
    }

    /// Start a session with a deterministic random source
    pub fn with_seed(config: GameConfig, level: usize, seed: u64) -> Result<Self, GameError> {
        Self::with_rng(config, level, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, level: usize, mut rng: StdRng) -> Result<Self, GameError> {
        config.validate()?;
        let objective = config
            .objective(level)
            .cloned()
            .ok_or(GameError::UnknownLevel(level))?;

        let preview = PreviewQueue::new(
            config.columns,
            config.preview_rows,
            objective.color_count,
            &mut rng,
        );

        let mut session = Self {
            grid: Grid::new(config.columns, config.rows),
            preview,
            level,
            color_stats: ColorStats::new(objective.color_count),
            objective,
            config,
            phase: Phase::Ready,
            clusters: Vec::new(),
            moves: Vec::new(),
            stats: GameStats::default(),
            selected: None,
            show_moves: false,
            bot: None,
            bot_timer: 0.0,
            clock: 0.0,
            clock_running: false,
            outcome: Outcome::InProgress,
            generation: 0,
            rng,
        };
        session.new_game(level)?;
        Ok(session)
    }

    /// Throw away the current attempt and generate a new grid for `level`
    pub fn new_game(&mut self, level: usize) -> Result<Vec<GameEvent>, GameError> {
        let objective = self
            .config
            .objective(level)
            .cloned()
            .ok_or(GameError::UnknownLevel(level))?;

        let spec = LevelSpec {
            columns: self.config.columns,
            rows: self.config.rows,
            preview_rows: self.config.preview_rows,
            color_count: objective.color_count,
            max_attempts: self.config.max_generation_attempts,
            max_cascade_waves: self.config.max_cascade_waves,
        };
        let generated = generate_level(&spec, &mut self.rng)?;

        self.grid = generated.grid;
        self.preview = generated.preview;
        self.level = level;
        self.color_stats = ColorStats::new(objective.color_count);
        self.objective = objective;
        self.stats = GameStats::default();
        self.phase = Phase::Ready;
        self.clusters.clear();
        self.moves = find_moves(&mut self.grid);
        self.selected = None;
        self.bot_timer = 0.0;
        self.clock = 0.0;
        self.clock_running = false;
        self.outcome = Outcome::InProgress;
        self.generation += 1;

        info!(level, name = %self.objective.name, attempts = generated.attempts, "New game");
        Ok(vec![GameEvent::NewGame {
            level,
            attempts: generated.attempts,
        }])
    }

    /// Replace the grid with a known layout, e.g. for puzzles and tests.
    ///
    /// Only allowed in `Ready`. The preview queue and scores are kept. A
    /// stable grid without moves ends the level immediately.
    pub fn set_grid(&mut self, grid: Grid) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != Phase::Ready {
            return Err(GameError::NotReady);
        }
        if grid.columns() != self.config.columns || grid.rows() != self.config.rows {
            return Err(GameError::GridMismatch {
                columns: self.config.columns,
                rows: self.config.rows,
                found_columns: grid.columns(),
                found_rows: grid.rows(),
            });
        }
        self.grid = grid;
        self.clusters = find_clusters(&self.grid);
        self.moves = find_moves(&mut self.grid);
        self.selected = None;
        self.generation += 1;

        let mut events = Vec::new();
        if self.clusters.is_empty() && self.moves.is_empty() && !self.outcome.is_finished() {
            self.finish(Outcome::GameOver(GameOverReason::NoMoves), &mut events);
        }
        Ok(events)
    }

    // ==================== Input ====================

    /// Click-style input: select, deselect, or swap with the selected tile
    pub fn select_tile(&mut self, coord: Coord) -> Result<Vec<GameEvent>, GameError> {
        if !self.grid.contains(coord) {
            self.selected = None;
            return Err(GameError::OutOfBounds(coord));
        }

        match self.selected {
            Some(selected) if selected == coord => {
                self.selected = None;
                Ok(vec![GameEvent::SelectionCleared])
            }
            Some(selected) if can_swap(selected, coord) => self.attempt_swap(coord, selected),
            _ => {
                self.selected = Some(coord);
                Ok(vec![GameEvent::TileSelected { coord }])
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Begin animating a swap of two adjacent tiles
    pub fn attempt_swap(&mut self, a: Coord, b: Coord) -> Result<Vec<GameEvent>, GameError> {
        if self.outcome.is_finished() {
            return Err(GameError::Finished);
        }
        if self.phase != Phase::Ready {
            return Err(GameError::NotReady);
        }
        for coord in [a, b] {
            if !self.grid.contains(coord) {
                return Err(GameError::OutOfBounds(coord));
            }
        }
        if !can_swap(a, b) {
            return Err(GameError::NotAdjacent);
        }

        let swap = Move::new(a, b);
        self.clock_running = true;
        self.selected = None;
        self.phase = Phase::start(ResolveStep::SwapAnimating(swap));
        debug!(?swap, "Swap started");
        Ok(vec![GameEvent::SwapStarted { swap }])
    }

    pub fn toggle_show_moves(&mut self) -> bool {
        self.show_moves = !self.show_moves;
        self.show_moves
    }

    /// Install or remove the bot player
    pub fn set_bot(&mut self, bot: Option<Box<dyn MoveStrategy>>) {
        self.bot = bot;
        self.bot_timer = 0.0;
    }

    pub fn bot_kind(&self) -> Option<StrategyKind> {
        self.bot.as_ref().map(|b| b.kind())
    }

    // ==================== Update ====================

    /// Advance timers by `dt` seconds and fire any due transition
    pub fn tick(&mut self, dt: f64) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if self.clock_running {
            self.clock += dt;
            if let Constraint::TimeLimit { .. } = self.objective.constraint {
                if !self.outcome.is_finished()
                    && self.objective.is_exceeded(self.stats.move_count, self.clock)
                {
                    self.finish(Outcome::GameOver(GameOverReason::TimeLimit), &mut events);
                }
            }
        }

        match self.phase {
            Phase::Ready => self.tick_bot(dt, &mut events),
            Phase::Resolving { step, elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed > self.config.animation_seconds {
                    self.advance(step, &mut events);
                } else {
                    self.phase = Phase::Resolving { step, elapsed };
                }
            }
        }

        events
    }

    fn advance(&mut self, step: ResolveStep, events: &mut Vec<GameEvent>) {
        match step {
            ResolveStep::SwapAnimating(swap) => {
                self.grid.swap(swap.from, swap.to);
                self.clusters = find_clusters(&self.grid);
                if self.clusters.is_empty() {
                    self.phase = Phase::start(ResolveStep::SwapRewinding(swap));
                    events.push(GameEvent::SwapRejected { swap });
                } else {
                    self.stats.move_count += 1;
                    self.phase = Phase::start(ResolveStep::RemoveAndDetect);
                    events.push(GameEvent::SwapCommitted {
                        swap,
                        clusters: self.clusters.len(),
                    });
                }
            }

            ResolveStep::SwapRewinding(swap) => {
                self.grid.swap(swap.from, swap.to);
                events.push(GameEvent::SwapReverted { swap });
                self.settle(events);
            }

            ResolveStep::RemoveAndDetect => {
                let clusters = find_clusters(&self.grid);
                if clusters.is_empty() {
                    self.settle(events);
                    return;
                }

                let delta = remove_clusters(&mut self.grid, &clusters);
                self.stats.record(&delta);
                self.color_stats.apply(&delta);
                debug!(
                    clusters = clusters.len(),
                    points = delta.total_points(),
                    "Clusters removed"
                );
                events.push(GameEvent::ClustersRemoved { clusters, delta });

                self.clusters.clear();
                self.phase = Phase::start(ResolveStep::ShiftAndRedetect);
                self.check_completion(events);
            }

            ResolveStep::ShiftAndRedetect => {
                let added = shift_tiles(&mut self.grid, &mut self.preview, &mut self.rng);
                events.push(GameEvent::TilesShifted { added });

                self.clusters = find_clusters(&self.grid);
                if self.clusters.is_empty() {
                    self.settle(events);
                } else {
                    self.phase = Phase::start(ResolveStep::RemoveAndDetect);
                }
            }
        }
    }

    /// Return to `Ready` and evaluate the objective on the stable board
    fn settle(&mut self, events: &mut Vec<GameEvent>) {
        self.phase = Phase::Ready;
        self.bot_timer = 0.0;
        self.generation += 1;
        self.clusters.clear();
        self.moves = find_moves(&mut self.grid);
        events.push(GameEvent::Settled {
            moves_available: self.moves.len(),
        });

        if self.outcome.is_finished() {
            return;
        }

        if self.objective.is_met(self.score()) {
            self.finish(Outcome::LevelComplete, events);
        } else if self.objective.is_exceeded(self.stats.move_count, self.clock) {
            let reason = match self.objective.constraint {
                Constraint::TimeLimit { .. } => GameOverReason::TimeLimit,
                _ => GameOverReason::MoveLimit,
            };
            self.finish(Outcome::GameOver(reason), events);
        } else if self.moves.is_empty() {
            self.finish(Outcome::GameOver(GameOverReason::NoMoves), events);
        }
    }

    fn check_completion(&mut self, events: &mut Vec<GameEvent>) {
        if !self.outcome.is_finished() && self.objective.is_met(self.score()) {
            self.finish(Outcome::LevelComplete, events);
        }
    }

    fn finish(&mut self, outcome: Outcome, events: &mut Vec<GameEvent>) {
        self.outcome = outcome;
        self.clock_running = false;
        let score = self.score();

        match outcome {
            Outcome::LevelComplete => {
                self.stats.completion_time = Some(self.clock);
                info!(level = self.level, score, time = self.clock, "Level complete");
                events.push(GameEvent::LevelCompleted {
                    score,
                    time: self.clock,
                });
            }
            Outcome::GameOver(reason) => {
                info!(level = self.level, score, ?reason, "Game over");
                events.push(GameEvent::GameOver { reason, score });
            }
            Outcome::InProgress => {}
        }
    }

    fn tick_bot(&mut self, dt: f64, events: &mut Vec<GameEvent>) {
        if self.outcome.is_finished() {
            return;
        }
        let Some(bot) = self.bot.as_mut() else {
            return;
        };

        self.bot_timer += dt;
        if self.bot_timer <= self.config.bot_delay_seconds {
            return;
        }
        self.bot_timer = 0.0;

        let ctx = StrategyContext {
            level: self.level,
            objective: &self.objective,
            score: self.color_stats.total(),
            moves_used: self.stats.move_count,
            generation: self.generation,
        };
        let Some(mv) = bot.select_move(&self.grid, &self.moves, &ctx) else {
            return;
        };

        match self.attempt_swap(mv.from, mv.to) {
            Ok(mut started) => events.append(&mut started),
            Err(e) => warn!(error = %e, ?mv, "Bot move rejected"),
        }
    }

    // ==================== Queries ====================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn preview(&self) -> &PreviewQueue {
        &self.preview
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Elapsed fraction of the current animation, 0 when `Ready`
    pub fn progress(&self) -> f64 {
        match self.phase {
            Phase::Ready => 0.0,
            Phase::Resolving { elapsed, .. } => {
                (elapsed / self.config.animation_seconds).clamp(0.0, 1.0)
            }
        }
    }

    /// Clusters on the board right now
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Moves available on the last settled board
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn show_moves(&self) -> bool {
        self.show_moves
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn color_stats(&self) -> &ColorStats {
        &self.color_stats
    }

    pub fn score(&self) -> u32 {
        self.color_stats.total()
    }

    pub fn selected(&self) -> Option<Coord> {
        self.selected
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_finished()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::Objective;
    use crate::strategy::{GreedyStrategy, RandomStrategy};

    fn config_with(objective: Objective) -> GameConfig {
        GameConfig {
            levels: vec![objective],
            ..GameConfig::default()
        }
    }

    /// Tick until the board is `Ready` again
    fn run_until_ready(session: &mut GameSession) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..10_000 {
            if session.is_ready() {
                return events;
            }
            events.extend(session.tick(0.31));
        }
        panic!("Session never settled");
    }

    /// 8x8 board without clusters; swapping (2,1) and (2,2) gives a row of five 0s
    fn scripted_grid() -> Grid {
        Grid::from_rows(&[
            [1, 2, 3, 4, 1, 2, 3, 4],
            [0, 0, 1, 0, 0, 3, 4, 1],
            [2, 3, 0, 1, 2, 4, 1, 2],
            [3, 4, 2, 3, 4, 1, 2, 3],
            [4, 1, 3, 4, 1, 2, 3, 4],
            [1, 2, 4, 1, 2, 3, 4, 1],
            [2, 3, 1, 2, 3, 4, 1, 2],
            [3, 4, 2, 3, 4, 1, 2, 3],
        ])
    }

    #[test]
    fn test_new_session_is_ready_and_stable() {
        let session = GameSession::with_seed(GameConfig::default(), 1, 7).unwrap();
        assert!(session.is_ready());
        assert!(session.clusters().is_empty());
        assert!(!session.moves().is_empty());
        assert!(session.grid().is_full());
        assert_eq!(session.score(), 0);
        assert_eq!(session.outcome(), Outcome::InProgress);
        assert_eq!(session.objective().color_count, 5);
    }

    #[test]
    fn test_unknown_level() {
        assert!(matches!(
            GameSession::with_seed(GameConfig::default(), 9, 1),
            Err(GameError::UnknownLevel(9))
        ));
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 1).unwrap();
        assert_eq!(session.new_game(0), Err(GameError::UnknownLevel(0)));
    }

    #[test]
    fn test_swap_waits_for_animation_before_mutating() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 3).unwrap();
        session.set_grid(scripted_grid()).unwrap();
        let before = session.grid().clone();

        let events = session
            .attempt_swap(Coord::new(2, 1), Coord::new(2, 2))
            .unwrap();
        assert!(matches!(events[0], GameEvent::SwapStarted { .. }));
        assert_eq!(session.phase().name(), "SwapAnimating");
        assert_eq!(session.grid(), &before);

        // Not enough time has passed
        assert!(session.tick(0.1).is_empty());
        assert!((session.progress() - 0.1 / 0.3).abs() < 1e-9);
        assert_eq!(session.grid(), &before);

        let events = session.tick(0.25);
        assert!(matches!(
            events[0],
            GameEvent::SwapCommitted { clusters: 1, .. }
        ));
        assert_eq!(session.phase().name(), "RemoveAndDetect");
        assert_eq!(session.stats().move_count, 1);

        let events = session.tick(0.31);
        match &events[0] {
            GameEvent::ClustersRemoved { delta, .. } => assert_eq!(delta.total_points(), 9),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(session.phase().name(), "ShiftAndRedetect");
        assert_eq!(session.stats().match5_plus_count, 1);
        assert_eq!(session.color_stats().get(0), 9);

        run_until_ready(&mut session);
        assert!(session.clusters().is_empty());
        assert!(session.grid().is_full());
        assert!(session.score() >= 9);
    }

    #[test]
    fn test_swap_without_match_is_rewound() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 3).unwrap();
        session.set_grid(scripted_grid()).unwrap();
        let before = session.grid().clone();

        session.attempt_swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        let events = session.tick(0.31);
        assert!(matches!(events[0], GameEvent::SwapRejected { .. }));
        assert_eq!(session.phase().name(), "SwapRewinding");
        assert_ne!(session.grid(), &before);

        let events = session.tick(0.31);
        assert!(matches!(events[0], GameEvent::SwapReverted { .. }));
        assert!(session.is_ready());
        assert_eq!(session.grid(), &before);
        assert_eq!(session.stats().move_count, 0);
    }

    #[test]
    fn test_swap_validation() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 3).unwrap();
        assert_eq!(
            session.attempt_swap(Coord::new(0, 0), Coord::new(2, 0)),
            Err(GameError::NotAdjacent)
        );
        assert_eq!(
            session.attempt_swap(Coord::new(7, 0), Coord::new(8, 0)),
            Err(GameError::OutOfBounds(Coord::new(8, 0)))
        );

        session.attempt_swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        assert_eq!(
            session.attempt_swap(Coord::new(0, 0), Coord::new(1, 0)),
            Err(GameError::NotReady)
        );
    }

    #[test]
    fn test_select_tile_flow() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 5).unwrap();

        let events = session.select_tile(Coord::new(3, 3)).unwrap();
        assert_eq!(events, vec![GameEvent::TileSelected { coord: Coord::new(3, 3) }]);
        assert_eq!(session.selected(), Some(Coord::new(3, 3)));

        // Same tile deselects
        session.select_tile(Coord::new(3, 3)).unwrap();
        assert_eq!(session.selected(), None);

        // Non-adjacent moves the selection
        session.select_tile(Coord::new(0, 0)).unwrap();
        session.select_tile(Coord::new(5, 5)).unwrap();
        assert_eq!(session.selected(), Some(Coord::new(5, 5)));

        // Adjacent starts a swap
        let events = session.select_tile(Coord::new(5, 6)).unwrap();
        assert!(matches!(events[0], GameEvent::SwapStarted { .. }));
        assert_eq!(session.selected(), None);
        assert!(!session.is_ready());

        assert_eq!(
            session.select_tile(Coord::new(9, 9)),
            Err(GameError::OutOfBounds(Coord::new(9, 9)))
        );
    }

    #[test]
    fn test_level_completes_when_target_reached() {
        let objective = Objective::new("Easy", "", 5, Constraint::Unlimited, 5);
        let mut session = GameSession::with_seed(config_with(objective), 1, 11).unwrap();
        session.set_grid(scripted_grid()).unwrap();

        session.attempt_swap(Coord::new(2, 1), Coord::new(2, 2)).unwrap();
        let events = run_until_ready(&mut session);

        assert_eq!(session.outcome(), Outcome::LevelComplete);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::LevelCompleted { .. })));
        assert!(session.stats().completion_time.is_some());
        assert_eq!(
            session.attempt_swap(Coord::new(0, 0), Coord::new(1, 0)),
            Err(GameError::Finished)
        );
    }

    #[test]
    fn test_move_limit_ends_in_game_over() {
        let objective = Objective::new("Limited", "", 100_000, Constraint::MoveLimit { moves: 10 }, 4);
        let mut session = GameSession::with_seed(config_with(objective), 1, 2024).unwrap();

        let mut applied = 0;
        while applied < 10 {
            assert_eq!(session.outcome(), Outcome::InProgress, "after {} moves", applied);
            let mv = session.moves()[0];
            session.attempt_swap(mv.from, mv.to).unwrap();
            run_until_ready(&mut session);
            applied += 1;
        }

        assert_eq!(session.stats().move_count, 10);
        assert_eq!(
            session.outcome(),
            Outcome::GameOver(GameOverReason::MoveLimit)
        );
    }

    #[test]
    fn test_time_limit_ends_in_game_over() {
        let objective = Objective::new("Timed", "", 100_000, Constraint::TimeLimit { seconds: 2.0 }, 5);
        let mut session = GameSession::with_seed(config_with(objective), 1, 8).unwrap();

        // Clock does not run before the first move
        session.tick(5.0);
        assert_eq!(session.outcome(), Outcome::InProgress);
        assert_eq!(session.clock(), 0.0);

        let mv = session.moves()[0];
        session.attempt_swap(mv.from, mv.to).unwrap();
        let mut events = run_until_ready(&mut session);
        for _ in 0..20 {
            events.extend(session.tick(0.5));
        }

        assert_eq!(
            session.outcome(),
            Outcome::GameOver(GameOverReason::TimeLimit)
        );
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::GameOver {
                reason: GameOverReason::TimeLimit,
                ..
            }
        )));
    }

    #[test]
    fn test_no_moves_ends_in_game_over() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 4).unwrap();
        // Diagonal stripes of five colors admit no matching swap
        let rows: Vec<Vec<u8>> = (0..8)
            .map(|r| (0..8).map(|c| ((c + 2 * r) % 5) as u8).collect())
            .collect();
        let grid = Grid::from_rows(&rows);
        let events = session.set_grid(grid).unwrap();

        assert!(session.moves().is_empty());
        assert_eq!(session.outcome(), Outcome::GameOver(GameOverReason::NoMoves));
        assert_eq!(
            events,
            vec![GameEvent::GameOver {
                reason: GameOverReason::NoMoves,
                score: 0
            }]
        );
        assert_eq!(
            session.attempt_swap(Coord::new(0, 0), Coord::new(1, 0)),
            Err(GameError::Finished)
        );
    }

    #[test]
    fn test_set_grid_with_moves_stays_in_progress() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 4).unwrap();
        assert_eq!(session.set_grid(scripted_grid()).unwrap(), vec![]);
        assert_eq!(session.outcome(), Outcome::InProgress);
        assert!(!session.moves().is_empty());
    }

    #[test]
    fn test_bot_plays_after_delay() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 21).unwrap();
        session.set_bot(Some(Box::new(RandomStrategy::with_seed(1))));
        assert_eq!(session.bot_kind(), Some(StrategyKind::Random));

        assert!(session.tick(0.2).is_empty());
        let events = session.tick(0.2);
        assert!(matches!(events[0], GameEvent::SwapStarted { .. }));

        run_until_ready(&mut session);
        assert_eq!(session.stats().move_count, 1);
    }

    #[test]
    fn test_greedy_bot_finishes_level_one() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 99).unwrap();
        session.set_bot(Some(Box::new(GreedyStrategy::with_seed(2))));

        for _ in 0..20_000 {
            if session.is_finished() && session.is_ready() {
                break;
            }
            session.tick(0.31);
        }

        assert!(session.is_finished());
        assert!(session.grid().is_full());
        if session.outcome() == Outcome::LevelComplete {
            assert!(session.score() >= 50);
        }
    }

    #[test]
    fn test_set_grid_rejects_wrong_size() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 1).unwrap();
        assert!(matches!(
            session.set_grid(Grid::new(3, 3)),
            Err(GameError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_new_game_resets_state() {
        let mut session = GameSession::with_seed(GameConfig::default(), 1, 12).unwrap();
        let mv = session.moves()[0];
        session.attempt_swap(mv.from, mv.to).unwrap();
        run_until_ready(&mut session);
        assert!(session.score() > 0);

        let generation = session.generation();
        session.new_game(2).unwrap();
        assert_eq!(session.level(), 2);
        assert_eq!(session.score(), 0);
        assert_eq!(session.stats(), &GameStats::default());
        assert_eq!(session.clock(), 0.0);
        assert_eq!(session.objective().color_count, 4);
        assert!(session.generation() > generation);
    }
}
