//! Stateless per-game-average projections

use chrono::NaiveDate;
use serde::Serialize;

use crate::features::CumulativeSeries;
use crate::{GameLogEntry, LeaguePlayerRow, PlayerId, Stat, SEASON_GAMES};

/// Heuristic season totals for one league row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueProjection {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_abbreviation: String,
    pub games_played: u32,
    pub projected_points: f64,
    pub projected_rebounds: f64,
    pub projected_assists: f64,
}

/// Cumulative stat line with its heuristic end-of-season total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatTrend {
    pub stat: Stat,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<u64>,
    pub projected: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Average-per-game extrapolation
#[derive(Debug, Clone, Copy)]
pub struct HeuristicProjector {
    season_games: u32,
}

impl Default for HeuristicProjector {
    fn default() -> Self {
        Self::new(SEASON_GAMES)
    }
}

impl HeuristicProjector {
    pub fn new(season_games: u32) -> Self {
        HeuristicProjector { season_games }
    }

    /// Games the average is multiplied by: those played plus those left
    pub fn games_basis(&self, games_played: u32) -> u32 {
        games_played + self.season_games.saturating_sub(games_played)
    }

    /// Projected season total from a per-game average
    pub fn project(&self, avg_per_game: f64, games_played: u32) -> f64 {
        avg_per_game * f64::from(self.games_basis(games_played))
    }

    /// Projections for every row, optionally limited to one team.
    ///
    /// `team` matches a numeric team id or a team abbreviation (any case).
    pub fn project_league(
        &self,
        rows: &[LeaguePlayerRow],
        team: Option<&str>,
    ) -> Vec<LeagueProjection> {
        rows.iter()
            .filter(|row| team.map_or(true, |t| team_matches(row, t)))
            .map(|row| {
                let project = |stat| round1(self.project(row.average(stat), row.games_played));
                LeagueProjection {
                    player_id: row.player_id,
                    player_name: row.player_name.clone(),
                    team_abbreviation: row.team_abbreviation.clone(),
                    games_played: row.games_played,
                    projected_points: project(Stat::Points),
                    projected_rebounds: project(Stat::Rebounds),
                    projected_assists: project(Stat::Assists),
                }
            })
            .collect()
    }

    /// Cumulative series for one stat plus its projection from the log's own average
    pub fn trend(&self, games: &[GameLogEntry], stat: Stat) -> StatTrend {
        let series = CumulativeSeries::from_log(games, stat);
        let played = series.len() as u32;
        let projected = if series.is_empty() {
            0.0
        } else {
            round1(self.project(series.average(), played))
        };

        StatTrend {
            stat,
            dates: series.points.iter().map(|p| p.game_date).collect(),
            values: series.points.iter().map(|p| p.total).collect(),
            projected,
        }
    }
}

fn team_matches(row: &LeaguePlayerRow, team: &str) -> bool {
    match team.parse::<u32>() {
        Ok(id) => row.team_id == id,
        Err(_) => row.team_abbreviation.eq_ignore_ascii_case(team),
    }
}
