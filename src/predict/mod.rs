//! Projections
//!
//! Model-based season totals from stored fits, and per-game-average heuristics.

pub mod heuristic;
pub mod inference;

pub use heuristic::{HeuristicProjector, LeagueProjection, StatTrend};
pub use inference::{ApiProjection, Predictor, SeasonProjection};
