//! Model training
//!
//! Per-player trainer and the season-wide batch runner.

pub mod batch;
pub mod trainer;

pub use batch::{BatchReport, BatchTrainer};
pub use trainer::{TrainOutcome, Trainer};
