//! Data access
//!
//! Stats API client and the on-disk store for trained projection models.

pub mod model_store;
pub mod stats_source;

pub use model_store::{ModelKey, ModelStore, StoredModel};
pub use stats_source::{NbaStatsClient, StatsSource};
