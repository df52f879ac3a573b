//! Feature extraction
//!
//! Turns raw game logs into the series the projection models are fitted on.

pub mod cumulative;

pub use cumulative::{CumulativePoint, CumulativeSeries};
