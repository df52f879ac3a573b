//! Projection models
//!
//! A single-feature least-squares line through (game number, cumulative stat).

pub mod linear;

pub use linear::ProjectionModel;
