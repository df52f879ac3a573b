//! Season totals from trained models

use serde::Serialize;

use crate::data::{ModelKey, ModelStore};
use crate::{PlayerId, Result, Season, SEASON_GAMES};

/// Model-based projection for one player-season
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonProjection {
    pub player_id: PlayerId,
    pub season: Season,
    /// Projected cumulative points after the last regular-season game
    pub projected_total: f64,
    pub projected_per_game: f64,
    /// Games the model was fitted on
    pub games_trained: usize,
    pub r_squared: f64,
}

/// JSON payload served to the web layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ApiProjection {
    pub player_id: u32,
    pub season: String,
    pub projected_pts_ml: f64,
    pub projected_ppg_ml: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl SeasonProjection {
    /// Rounded API form: total to 1 decimal, per game to 2
    pub fn to_api(&self) -> ApiProjection {
        ApiProjection {
            player_id: self.player_id.0,
            season: self.season.to_string(),
            projected_pts_ml: round_to(self.projected_total, 1),
            projected_ppg_ml: round_to(self.projected_per_game, 2),
        }
    }
}

/// Evaluates stored models at the end of the regular season
pub struct Predictor {
    store: ModelStore,
    season_games: u32,
}

impl Predictor {
    pub fn new(store: ModelStore) -> Self {
        Predictor {
            store,
            season_games: SEASON_GAMES,
        }
    }

    /// Override the regular-season length
    pub fn with_season_games(mut self, season_games: u32) -> Self {
        self.season_games = season_games.max(1);
        self
    }

    /// Projected season points for a player.
    ///
    /// The fitted line is extrapolated to the final game without clamping.
    /// Fails with `ModelNotFound` when the player-season was never trained.
    pub fn predict_season_total(
        &self,
        player: PlayerId,
        season: Season,
    ) -> Result<SeasonProjection> {
        let record = self.store.get(ModelKey::new(player, season))?;
        let games = f64::from(self.season_games);
        let projected_total = record.model.evaluate(games);

        Ok(SeasonProjection {
            player_id: player,
            season,
            projected_total,
            projected_per_game: projected_total / games,
            games_trained: record.model.games,
            r_squared: record.model.r_squared,
        })
    }

    /// Projected cumulative points through an arbitrary game number
    pub fn predict_at(&self, player: PlayerId, season: Season, game_index: u32) -> Result<f64> {
        let record = self.store.get(ModelKey::new(player, season))?;
        Ok(record.model.evaluate(f64::from(game_index)))
    }
}

/// Format a projection for display
pub fn format_projection(projection: &SeasonProjection, season_games: u32) -> String {
    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  Player {} - {}
├─────────────────────────────────────────────────┤
│  Projected points:  {:.1} over {} games
│  Points per game:   {:.2}
│  Trained on:        {} games (r² {:.3})
└─────────────────────────────────────────────────┘
"#,
        projection.player_id,
        projection.season,
        projection.projected_total,
        season_games,
        projection.projected_per_game,
        projection.games_trained,
        projection.r_squared
    )
}
