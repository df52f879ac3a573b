//! NBA season projections
//!
//! Fits a per-player linear trend (game number vs cumulative points) from
//! stats API game logs and extrapolates it to the end of the regular season.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::data::ModelKey;

/// Length of an NBA regular season in games
pub const SEASON_GAMES: u32 = 82;

/// NBA stats player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Reject the zero id, which the stats API never issues
    pub fn validate(self) -> Result<Self> {
        if self.0 == 0 {
            Err(ProjectionError::InvalidPlayer(self.0))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// NBA season, identified by the calendar year it starts in.
///
/// Equivalent spellings (`2024-25`, `2024-2025`, `202425`) parse to the same
/// value, so anything derived from a `Season` never depends on how it was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Season {
    start_year: u16,
}

fn season_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})(?:-?(\d{2})|-(\d{4}))$").expect("season pattern is valid")
    })
}

impl Season {
    pub fn new(start_year: u16) -> Self {
        Season { start_year }
    }

    /// Season in progress on the given date. A season starts in October.
    pub fn current(today: NaiveDate) -> Self {
        let year = today.year() as u16;
        if today.month() >= 10 {
            Season::new(year)
        } else {
            Season::new(year - 1)
        }
    }

    pub fn start_year(&self) -> u16 {
        self.start_year
    }

    /// Last two digits of the year the season ends in
    fn end_suffix(&self) -> u32 {
        (u32::from(self.start_year) + 1) % 100
    }

    /// Hyphen-free form used in file names, e.g. `202425`
    pub fn compact(&self) -> String {
        format!("{}{:02}", self.start_year, self.end_suffix())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.start_year, self.end_suffix())
    }
}

impl FromStr for Season {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ProjectionError::InvalidSeason(s.to_string());
        let caps = season_pattern().captures(s.trim()).ok_or_else(invalid)?;

        let start: u16 = caps[1].parse().map_err(|_| invalid())?;
        let end_matches = match (caps.get(2), caps.get(3)) {
            (Some(short), _) => short.as_str().parse::<u16>().ok() == Some((start + 1) % 100),
            (_, Some(long)) => long.as_str().parse::<u16>().ok() == Some(start + 1),
            _ => false,
        };

        if end_matches {
            Ok(Season::new(start))
        } else {
            Err(invalid())
        }
    }
}

impl Serialize for Season {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Season {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Counting statistic tracked per game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Points,
    Rebounds,
    Assists,
}

impl Stat {
    /// Column name used by the stats API
    pub fn column(&self) -> &'static str {
        match self {
            Stat::Points => "PTS",
            Stat::Rebounds => "REB",
            Stat::Assists => "AST",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Points => write!(f, "points"),
            Stat::Rebounds => write!(f, "rebounds"),
            Stat::Assists => write!(f, "assists"),
        }
    }
}

impl FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pts" | "points" => Ok(Stat::Points),
            "reb" | "rebounds" => Ok(Stat::Rebounds),
            "ast" | "assists" => Ok(Stat::Assists),
            _ => Err(format!("Unknown stat: {}. Use pts, reb or ast.", s)),
        }
    }
}

/// One regular-season game from a player's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLogEntry {
    pub game_date: NaiveDate,
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
}

impl GameLogEntry {
    pub fn value(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Points => self.points,
            Stat::Rebounds => self.rebounds,
            Stat::Assists => self.assists,
        }
    }
}

/// League-wide per-game averages for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaguePlayerRow {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_id: u32,
    pub team_abbreviation: String,
    pub games_played: u32,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
}

impl LeaguePlayerRow {
    pub fn average(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Points => self.points,
            Stat::Rebounds => self.rebounds,
            Stat::Assists => self.assists,
        }
    }
}

/// Projection pipeline errors
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Stats source timed out: {0}")]
    SourceTimeout(String),

    #[error("Unexpected stats source data: {0}")]
    SourceData(String),

    #[error("Stats source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("Insufficient data: have {games} games, need {required}")]
    InsufficientData { games: usize, required: usize },

    #[error("No trained model for {0} - run `hoops train` first")]
    ModelNotFound(ModelKey),

    #[error("Regression fit failed: {0}")]
    Fit(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Invalid season: {0} (expected YYYY-YY)")]
    InvalidSeason(String),

    #[error("Invalid player id: {0}")]
    InvalidPlayer(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ProjectionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProjectionError::SourceTimeout(e.to_string())
        } else {
            ProjectionError::Http(e)
        }
    }
}

impl ProjectionError {
    /// True when no model has been trained for the requested key
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProjectionError::ModelNotFound(_))
    }

    /// True for transient source failures worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProjectionError::SourceTimeout(_)
                | ProjectionError::SourceUnavailable(_)
                | ProjectionError::Http(_)
        )
    }

    /// HTTP status a web layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            ProjectionError::ModelNotFound(_) => 404,
            ProjectionError::SourceTimeout(_) => 504,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Application configuration loaded from hoops.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub user_agent: String,
    pub referer: String,
    pub accept_language: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            base_url: "https://stats.nba.com/stats".to_string(),
            timeout_secs: 30,
            max_attempts: 1,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://www.nba.com/".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub model_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            model_dir: "models".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub season_games: u32,
    pub workers: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        ProjectionConfig {
            season_games: SEASON_GAMES,
            workers: 1,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProjectionError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ProjectionError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProjectionError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.projection.season_games == 0 {
            return Err(ProjectionError::Config(
                "projection.season_games must be positive".to_string(),
            ));
        }
        if self.stats.timeout_secs == 0 {
            return Err(ProjectionError::Config(
                "stats.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_spellings_agree() {
        let a: Season = "2024-25".parse().unwrap();
        let b: Season = "2024-2025".parse().unwrap();
        let c: Season = "202425".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.to_string(), "2024-25");
        assert_eq!(a.compact(), "202425");
    }

    #[test]
    fn test_season_century_rollover() {
        let season: Season = "1999-00".parse().unwrap();
        assert_eq!(season.start_year(), 1999);
        assert_eq!(season.to_string(), "1999-00");
        assert_eq!(season.compact(), "199900");
    }

    #[test]
    fn test_invalid_seasons() {
        for s in ["2024-26", "2024", "24-25", "2024/25", "abcd-ef", "2024-2026"] {
            assert!(
                matches!(s.parse::<Season>(), Err(ProjectionError::InvalidSeason(_))),
                "{} should be rejected",
                s
            );
        }
    }

    #[test]
    fn test_current_season() {
        let october = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        assert_eq!(Season::current(october).to_string(), "2024-25");

        let september = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        assert_eq!(Season::current(september).to_string(), "2024-25");

        let january = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(Season::current(january).to_string(), "2024-25");
    }

    #[test]
    fn test_stat_parsing() {
        assert_eq!("PTS".parse::<Stat>().unwrap(), Stat::Points);
        assert_eq!("rebounds".parse::<Stat>().unwrap(), Stat::Rebounds);
        assert_eq!("ast".parse::<Stat>().unwrap(), Stat::Assists);
        assert!("blk".parse::<Stat>().is_err());
    }

    #[test]
    fn test_player_id_validation() {
        assert!(PlayerId(2544).validate().is_ok());
        assert!(matches!(
            PlayerId(0).validate(),
            Err(ProjectionError::InvalidPlayer(0))
        ));
    }

    #[test]
    fn test_error_status_mapping() {
        let key = ModelKey::new(PlayerId(12345), Season::new(2024));
        assert_eq!(ProjectionError::ModelNotFound(key).http_status(), 404);
        assert!(ProjectionError::ModelNotFound(key).is_not_found());
        assert_eq!(ProjectionError::SourceTimeout("t".into()).http_status(), 504);
        assert_eq!(ProjectionError::Prediction("bad".into()).http_status(), 500);
        assert!(ProjectionError::SourceTimeout("t".into()).is_retryable());
        assert!(!ProjectionError::Fit("x".into()).is_retryable());
        assert!(ProjectionError::SourceUnavailable("503".into()).is_retryable());
        assert!(!ProjectionError::SourceData("404".into()).is_retryable());
        assert_eq!(ProjectionError::SourceUnavailable("503".into()).http_status(), 500);
    }

    #[test]
    fn test_season_at_u16_limit() {
        let season = Season::new(u16::MAX);
        assert_eq!(season.compact(), "6553536");
        assert_eq!(season.to_string(), "65535-36");
    }

    #[test]
    fn test_config_round_trip_defaults() {
        let config: Config = toml::from_str("[data]\nmodel_dir = \"/tmp/m\"\n").unwrap();
        assert_eq!(config.data.model_dir, "/tmp/m");
        assert_eq!(config.projection.season_games, SEASON_GAMES);
        assert_eq!(config.stats.timeout_secs, 30);
    }
}
