//! Per-player projection training

use chrono::Utc;

use crate::data::{ModelStore, StatsSource, StoredModel};
use crate::features::CumulativeSeries;
use crate::model::linear::MIN_FIT_POINTS;
use crate::model::ProjectionModel;
use crate::{PlayerId, Result, Season, Stat};

/// Result of a training run that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum TrainOutcome {
    /// Model fitted and written to the store
    Trained(StoredModel),
    /// Too few games for a line; nothing written
    Skipped { games: usize },
}

/// Fits cumulative-points models from a stats source into a model store
pub struct Trainer<S> {
    source: S,
    store: ModelStore,
}

impl<S: StatsSource> Trainer<S> {
    pub fn new(source: S, store: ModelStore) -> Self {
        Trainer { source, store }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Train and persist the points model for one player-season.
    ///
    /// Overwrites any previous model for the same key. Source and store
    /// errors are returned unchanged.
    pub fn train(&self, player: PlayerId, season: Season) -> Result<TrainOutcome> {
        let player = player.validate()?;
        let games = self.source.game_log(player, season)?;
        let series = CumulativeSeries::from_log(&games, Stat::Points);

        if series.len() < MIN_FIT_POINTS {
            log::info!(
                "Skipping player {} ({}): {} games logged",
                player,
                season,
                series.len()
            );
            return Ok(TrainOutcome::Skipped {
                games: series.len(),
            });
        }

        let model = ProjectionModel::fit(&series.game_indices(), &series.totals())?;
        let record = StoredModel {
            player_id: player,
            season,
            stat: Stat::Points,
            trained_at: Utc::now(),
            model,
        };

        let path = self.store.put(&record)?;
        log::info!(
            "Trained player {} ({}) on {} games: slope={:.3} intercept={:.3} r2={:.3} -> {}",
            player,
            season,
            model.games,
            model.slope,
            model.intercept,
            model.r_squared,
            path.display()
        );

        Ok(TrainOutcome::Trained(record))
    }
}
