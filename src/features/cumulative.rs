//! Running totals of a counting stat over a player's season

use crate::{GameLogEntry, Stat};
use chrono::NaiveDate;
use serde::Serialize;

/// Running total after one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CumulativePoint {
    /// 1-based position in date order
    pub game_index: u32,
    pub game_date: NaiveDate,
    pub total: u64,
}

/// Cumulative stat series, one point per game played
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeSeries {
    pub stat: Stat,
    pub points: Vec<CumulativePoint>,
}

impl CumulativeSeries {
    /// Build from a game log in any order. Games are ranked by date; games on
    /// the same date keep their log order.
    pub fn from_log(log: &[GameLogEntry], stat: Stat) -> Self {
        let mut games: Vec<&GameLogEntry> = log.iter().collect();
        games.sort_by_key(|g| g.game_date);

        let mut total = 0u64;
        let points = games
            .into_iter()
            .zip(1u32..)
            .map(|(game, game_index)| {
                total += u64::from(game.value(stat));
                CumulativePoint {
                    game_index,
                    game_date: game.game_date,
                    total,
                }
            })
            .collect();

        CumulativeSeries { stat, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Season total so far
    pub fn total(&self) -> u64 {
        self.points.last().map(|p| p.total).unwrap_or(0)
    }

    /// Per-game average so far (0 with no games)
    pub fn average(&self) -> f64 {
        if self.points.is_empty() {
            0.0
        } else {
            self.total() as f64 / self.points.len() as f64
        }
    }

    /// Game indices as regression inputs
    pub fn game_indices(&self) -> Vec<f64> {
        self.points.iter().map(|p| f64::from(p.game_index)).collect()
    }

    /// Running totals as regression targets
    pub fn totals(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.total as f64).collect()
    }
}
