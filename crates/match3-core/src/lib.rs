//! Match3 - a tile-matching puzzle engine
//!
//! This crate provides the core game logic, including:
//! - Column-major tile grid with per-column preview queues
//! - Cluster detection, move discovery and cascade resolution
//! - Level objectives with time or move limits
//! - A timed session state machine that drives the animations
//! - Bot strategies, including one backed by an external suggestion service
//!
//! # Architecture
//!
//! The engine has no rendering or I/O of its own. A frontend calls
//! [`GameSession::tick`] once per frame and draws a [`SessionSnapshot`].
//! It can be compiled to:
//! - Native Rust for server-side sessions
//! - WebAssembly for in-browser play (feature `wasm`)
//!
//! # Modules
//!
//! - [`grid`]: Tile storage, coordinates and preview queues
//! - [`cluster`]: Runs of three or more same-colored tiles
//! - [`moves`]: Swaps that would create a cluster
//! - [`cascade`]: Removal, scoring, gravity and refill
//! - [`level`]: Generation of stable, playable grids
//! - [`session`]: The game state machine

pub mod cascade;
pub mod cluster;
pub mod config;
pub mod events;
pub mod grid;
pub mod level;
pub mod moves;
pub mod objective;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod strategy;
pub mod suggestion;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cascade::{cluster_points, ScoreDelta};
pub use cluster::{find_clusters, Cluster, Orientation};
pub use config::{ConfigError, GameConfig};
pub use events::{GameEvent, GameOverReason, Outcome};
pub use grid::{Color, Coord, Grid, GridError, PreviewQueue};
pub use level::{generate_level, GenerationError, LevelSpec};
pub use moves::{can_swap, find_moves, Move};
pub use objective::{default_levels, Constraint, Objective};
pub use session::{GameError, GameSession, Phase, ResolveStep};
pub use snapshot::SessionSnapshot;
pub use stats::{ColorStats, GameStats};
pub use strategy::{
    GreedyStrategy, MoveStrategy, RandomStrategy, StrategyContext, StrategyKind,
    SuggestionStrategy,
};
pub use suggestion::{
    SuggestionError, SuggestionRequest, SuggestionResponse, SuggestionResult, SuggestionSource,
};
