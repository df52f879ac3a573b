//! Test fixtures: game logs and an in-memory stats source

use crate::data::StatsSource;
use crate::{GameLogEntry, LeaguePlayerRow, PlayerId, ProjectionError, Result, Season};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn game(
    year: i32,
    month: u32,
    day: u32,
    points: u32,
    rebounds: u32,
    assists: u32,
) -> GameLogEntry {
    GameLogEntry {
        game_date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
        points,
        rebounds,
        assists,
    }
}

/// One game every other day from opening night, with the given points
pub fn points_log(points: &[u32]) -> Vec<GameLogEntry> {
    let opening = NaiveDate::from_ymd_opt(2024, 10, 22).unwrap();
    points
        .iter()
        .enumerate()
        .map(|(i, &pts)| GameLogEntry {
            game_date: opening + Duration::days(2 * i as i64),
            points: pts,
            rebounds: 5,
            assists: 3,
        })
        .collect()
}

pub fn league_row(player: u32, team: &str, games_played: u32, points: f64) -> LeaguePlayerRow {
    LeaguePlayerRow {
        player_id: PlayerId(player),
        player_name: format!("Player {}", player),
        team_id: team.bytes().map(u32::from).sum(),
        team_abbreviation: team.to_string(),
        games_played,
        points,
        rebounds: points / 4.0,
        assists: points / 5.0,
    }
}

/// Canned response for one player's game log
#[derive(Debug, Clone)]
pub enum FakeLog {
    Games(Vec<GameLogEntry>),
    Timeout,
    BadData,
}

/// In-memory stats source with swappable responses
#[derive(Default)]
pub struct FakeSource {
    logs: Mutex<HashMap<PlayerId, FakeLog>>,
    league: Vec<LeaguePlayerRow>,
    league_fails: bool,
    pub log_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(self, player: u32, log: FakeLog) -> Self {
        self.set_log(player, log);
        self
    }

    pub fn with_league(mut self, rows: Vec<LeaguePlayerRow>) -> Self {
        self.league = rows;
        self
    }

    pub fn with_failing_league(mut self) -> Self {
        self.league_fails = true;
        self
    }

    pub fn set_log(&self, player: u32, log: FakeLog) {
        self.logs.lock().unwrap().insert(PlayerId(player), log);
    }
}

impl StatsSource for FakeSource {
    fn game_log(&self, player: PlayerId, _season: Season) -> Result<Vec<GameLogEntry>> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        match self.logs.lock().unwrap().get(&player) {
            Some(FakeLog::Games(games)) => Ok(games.clone()),
            Some(FakeLog::Timeout) => Err(ProjectionError::SourceTimeout(format!(
                "game log for {} timed out",
                player
            ))),
            Some(FakeLog::BadData) => Err(ProjectionError::SourceData(
                "missing column PTS".to_string(),
            )),
            None => Ok(Vec::new()),
        }
    }

    fn league_players(&self, _season: Season) -> Result<Vec<LeaguePlayerRow>> {
        if self.league_fails {
            return Err(ProjectionError::SourceTimeout("league stats timed out".to_string()));
        }
        Ok(self.league.clone())
    }
}
