//! NBA stats API access
//!
//! The stats API answers every endpoint with one or more tabular result sets
//! (`headers` plus `rowSet`). Columns are looked up by header name so extra or
//! reordered columns are tolerated.

use crate::{
    GameLogEntry, LeaguePlayerRow, PlayerId, ProjectionError, Result, Season, Stat, StatsConfig,
};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Supplier of player game logs and league-wide per-game rows
pub trait StatsSource {
    /// Regular-season game log for one player, in any order
    fn game_log(&self, player: PlayerId, season: Season) -> Result<Vec<GameLogEntry>>;

    /// Per-game averages for every player who appeared in the season
    fn league_players(&self, season: Season) -> Result<Vec<LeaguePlayerRow>>;
}

impl<S: StatsSource + ?Sized> StatsSource for &S {
    fn game_log(&self, player: PlayerId, season: Season) -> Result<Vec<GameLogEntry>> {
        (**self).game_log(player, season)
    }

    fn league_players(&self, season: Season) -> Result<Vec<LeaguePlayerRow>> {
        (**self).league_players(season)
    }
}

/// Retry a source operation with exponential backoff.
///
/// Only transient failures are retried: timeouts, transport errors, and
/// throttling or server-side (429/5xx) responses.
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                let delay = Duration::from_millis(100 * 2u64.pow(attempt));
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Blocking client for stats.nba.com
pub struct NbaStatsClient {
    client: reqwest::blocking::Client,
    base_url: String,
    max_attempts: u32,
}

impl NbaStatsClient {
    pub fn new(config: &StatsConfig) -> Result<Self> {
        // The API rejects requests that do not look like they come from nba.com
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, header_value(&config.referer)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(NbaStatsClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts,
        })
    }

    fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<StatsResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {} {:?}", url, query);

        let body = with_retry(
            || {
                let resp = self.client.get(&url).query(query).send()?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(status_error(endpoint, status));
                }
                Ok(resp.text()?)
            },
            self.max_attempts,
        )?;

        parse_response(&body)
    }
}

/// Throttling and server faults are transient; anything else is a bad request
fn status_error(endpoint: &str, status: StatusCode) -> ProjectionError {
    let message = format!("{} returned {}", endpoint, status);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ProjectionError::SourceUnavailable(message)
    } else {
        ProjectionError::SourceData(message)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ProjectionError::Config(format!("Invalid header value {:?}: {}", value, e)))
}

impl StatsSource for NbaStatsClient {
    fn game_log(&self, player: PlayerId, season: Season) -> Result<Vec<GameLogEntry>> {
        log::info!("Fetching game log for player {} ({})", player, season);
        let response = self.fetch(
            "playergamelog",
            &[
                ("PlayerID", player.to_string()),
                ("Season", season.to_string()),
                ("SeasonType", "Regular Season".to_string()),
            ],
        )?;
        parse_game_log(&response)
    }

    fn league_players(&self, season: Season) -> Result<Vec<LeaguePlayerRow>> {
        log::info!("Fetching league player stats for {}", season);
        let mut query = vec![
            ("Season", season.to_string()),
            ("SeasonType", "Regular Season".to_string()),
            ("PerMode", "PerGame".to_string()),
            ("MeasureType", "Base".to_string()),
            ("LeagueID", "00".to_string()),
        ];
        // Required by the endpoint even when unused
        for key in [
            "LastNGames",
            "Month",
            "OpponentTeamID",
            "Period",
            "PORound",
            "TeamID",
        ] {
            query.push((key, "0".to_string()));
        }
        for key in ["PaceAdjust", "PlusMinus", "Rank"] {
            query.push((key, "N".to_string()));
        }

        let response = self.fetch("leaguedashplayerstats", &query)?;
        parse_league_players(&response)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    rows: Vec<Vec<Value>>,
}

impl StatsResponse {
    fn first_set(&self) -> Result<&ResultSet> {
        self.result_sets
            .first()
            .ok_or_else(|| ProjectionError::SourceData("response has no result sets".to_string()))
    }
}

impl ResultSet {
    fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ProjectionError::SourceData(format!("{}: missing column {}", self.name, name))
            })
    }
}

pub(crate) fn parse_response(body: &str) -> Result<StatsResponse> {
    serde_json::from_str(body)
        .map_err(|e| ProjectionError::SourceData(format!("malformed stats response: {}", e)))
}

fn cell<'a>(row: &'a [Value], idx: usize, column: &str) -> Result<&'a Value> {
    match row.get(idx) {
        Some(Value::Null) | None => Err(ProjectionError::SourceData(format!(
            "missing value for {}",
            column
        ))),
        Some(v) => Ok(v),
    }
}

fn count_value(row: &[Value], idx: usize, column: &str) -> Result<u32> {
    let v = cell(row, idx, column)?;
    v.as_u64()
        .or_else(|| {
            v.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ProjectionError::SourceData(format!("{}: bad count {}", column, v)))
}

fn average_value(row: &[Value], idx: usize, column: &str) -> Result<f64> {
    let v = cell(row, idx, column)?;
    v.as_f64()
        .filter(|f| *f >= 0.0)
        .ok_or_else(|| ProjectionError::SourceData(format!("{}: bad average {}", column, v)))
}

fn text_value(row: &[Value], idx: usize, column: &str) -> Result<String> {
    let v = cell(row, idx, column)?;
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| ProjectionError::SourceData(format!("{}: expected text, got {}", column, v)))
}

/// Parse a game date as the API writes it (`OCT 22, 2024`) or in ISO form
pub(crate) fn parse_game_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let formats = ["%b %d, %Y", "%B %d, %Y", "%Y-%m-%d", "%Y-%m-%dT%H:%M:%S"];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

fn stat_columns(set: &ResultSet) -> Result<[usize; 3]> {
    Ok([
        set.column(Stat::Points.column())?,
        set.column(Stat::Rebounds.column())?,
        set.column(Stat::Assists.column())?,
    ])
}

pub(crate) fn parse_game_log(response: &StatsResponse) -> Result<Vec<GameLogEntry>> {
    let set = response.first_set()?;
    let date_col = set.column("GAME_DATE")?;
    let [pts_col, reb_col, ast_col] = stat_columns(set)?;

    set.rows
        .iter()
        .map(|row| {
            let raw_date = text_value(row, date_col, "GAME_DATE")?;
            let game_date = parse_game_date(&raw_date).ok_or_else(|| {
                ProjectionError::SourceData(format!("GAME_DATE: unparseable {:?}", raw_date))
            })?;

            Ok(GameLogEntry {
                game_date,
                points: count_value(row, pts_col, Stat::Points.column())?,
                rebounds: count_value(row, reb_col, Stat::Rebounds.column())?,
                assists: count_value(row, ast_col, Stat::Assists.column())?,
            })
        })
        .collect()
}

pub(crate) fn parse_league_players(response: &StatsResponse) -> Result<Vec<LeaguePlayerRow>> {
    let set = response.first_set()?;
    let id_col = set.column("PLAYER_ID")?;
    let name_col = set.column("PLAYER_NAME")?;
    let team_col = set.column("TEAM_ID")?;
    let abbr_col = set.column("TEAM_ABBREVIATION")?;
    let gp_col = set.column("GP")?;
    let [pts_col, reb_col, ast_col] = stat_columns(set)?;

    set.rows
        .iter()
        .map(|row| {
            Ok(LeaguePlayerRow {
                player_id: PlayerId(count_value(row, id_col, "PLAYER_ID")?),
                player_name: text_value(row, name_col, "PLAYER_NAME")?,
                team_id: count_value(row, team_col, "TEAM_ID")?,
                team_abbreviation: text_value(row, abbr_col, "TEAM_ABBREVIATION")?,
                games_played: count_value(row, gp_col, "GP")?,
                points: average_value(row, pts_col, Stat::Points.column())?,
                rebounds: average_value(row, reb_col, Stat::Rebounds.column())?,
                assists: average_value(row, ast_col, Stat::Assists.column())?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    const GAME_LOG: &str = r#"{
        "resource": "playergamelog",
        "resultSets": [{
            "name": "PlayerGameLog",
            "headers": ["SEASON_ID", "Player_ID", "Game_ID", "GAME_DATE", "MATCHUP", "PTS", "REB", "AST"],
            "rowSet": [
                ["22024", 2544, "0022400062", "OCT 24, 2024", "LAL vs. PHX", 21, 8, 6],
                ["22024", 2544, "0022400003", "OCT 22, 2024", "LAL vs. MIN", 16, 10, 5]
            ]
        }]
    }"#;

    const LEAGUE: &str = r#"{
        "resultSets": [{
            "name": "LeagueDashPlayerStats",
            "headers": ["PLAYER_ID", "PLAYER_NAME", "TEAM_ID", "TEAM_ABBREVIATION", "AGE", "GP", "PTS", "REB", "AST"],
            "rowSet": [
                [2544, "LeBron James", 1610612747, "LAL", 40.0, 70, 24.4, 7.8, 8.2],
                [201939, "Stephen Curry", 1610612744, "GSW", 37.0, 70, 24.5, 4.4, 6.0]
            ]
        }]
    }"#;

    #[test]
    fn test_parse_game_log() {
        let response = parse_response(GAME_LOG).unwrap();
        let log = parse_game_log(&response).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log[0].game_date, NaiveDate::from_ymd_opt(2024, 10, 24).unwrap());
        assert_eq!(log[0].points, 21);
        assert_eq!(log[1].rebounds, 10);
        assert_eq!(log[1].assists, 5);
    }

    #[test]
    fn test_parse_league_players() {
        let response = parse_response(LEAGUE).unwrap();
        let rows = parse_league_players(&response).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player_id, PlayerId(2544));
        assert_eq!(rows[0].team_abbreviation, "LAL");
        assert_eq!(rows[1].games_played, 70);
        assert!((rows[1].points - 24.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_column_is_data_error() {
        let body = r#"{"resultSets":[{"name":"PlayerGameLog","headers":["GAME_DATE","PTS"],"rowSet":[]}]}"#;
        let response = parse_response(body).unwrap();
        assert!(matches!(
            parse_game_log(&response),
            Err(ProjectionError::SourceData(_))
        ));
    }

    #[test]
    fn test_null_and_negative_values_rejected() {
        let body = r#"{"resultSets":[{"headers":["GAME_DATE","PTS","REB","AST"],
            "rowSet":[["OCT 22, 2024", null, 1, 1]]}]}"#;
        let response = parse_response(body).unwrap();
        assert!(matches!(
            parse_game_log(&response),
            Err(ProjectionError::SourceData(_))
        ));

        let body = r#"{"resultSets":[{"headers":["GAME_DATE","PTS","REB","AST"],
            "rowSet":[["OCT 22, 2024", -3, 1, 1]]}]}"#;
        let response = parse_response(body).unwrap();
        assert!(parse_game_log(&response).is_err());
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_response("<html>blocked</html>"),
            Err(ProjectionError::SourceData(_))
        ));
        let empty = parse_response(r#"{"resultSets":[]}"#).unwrap();
        assert!(parse_game_log(&empty).is_err());
    }

    #[test]
    fn test_date_parsing() {
        assert_eq!(
            parse_game_date("OCT 22, 2024"),
            NaiveDate::from_ymd_opt(2024, 10, 22)
        );
        assert_eq!(
            parse_game_date("Apr 13, 2025"),
            NaiveDate::from_ymd_opt(2025, 4, 13)
        );
        assert_eq!(
            parse_game_date("2025-01-05"),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(
            parse_game_date("2025-01-05T00:00:00"),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(parse_game_date("yesterday"), None);
    }

    #[test]
    fn test_retry_stops_on_non_retryable() {
        let mut calls = 0;
        let result: Result<()> = with_retry(
            || {
                calls += 1;
                Err(ProjectionError::SourceData("bad".to_string()))
            },
            3,
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retry_recovers_from_timeout() {
        let mut calls = 0;
        let result = with_retry(
            || {
                calls += 1;
                if calls < 2 {
                    Err(ProjectionError::SourceTimeout("slow".to_string()))
                } else {
                    Ok(calls)
                }
            },
            3,
        );
        assert_eq!(result.unwrap(), 2);
    }

    /// Local server that handles one connection, then returns its base URL
    fn serve_once(response: Option<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut buf = [0u8; 4096];
            match response {
                Some(raw) => {
                    let _ = stream.read(&mut buf);
                    let _ = stream.write_all(raw.as_bytes());
                }
                // Hold the connection open without answering until the client gives up
                None => while matches!(stream.read(&mut buf), Ok(n) if n > 0) {},
            }
        });
        format!("http://{}", addr)
    }

    fn empty_response(status: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status
        )
    }

    fn client_for(base_url: String) -> NbaStatsClient {
        NbaStatsClient::new(&StatsConfig {
            base_url,
            timeout_secs: 1,
            ..StatsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_client_timeout_is_source_timeout() {
        let client = client_for(serve_once(None));
        let result = client.game_log(PlayerId(1), Season::new(2024));
        assert!(matches!(result, Err(ProjectionError::SourceTimeout(_))));
    }

    #[test]
    fn test_client_server_error_is_unavailable() {
        let client = client_for(serve_once(Some(empty_response("503 Service Unavailable"))));
        let err = client
            .game_log(PlayerId(1), Season::new(2024))
            .unwrap_err();
        assert!(matches!(err, ProjectionError::SourceUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_rejected_request_is_data_error() {
        let client = client_for(serve_once(Some(empty_response("400 Bad Request"))));
        let result = client.league_players(Season::new(2024));
        assert!(matches!(result, Err(ProjectionError::SourceData(_))));
    }

    #[test]
    fn test_client_parses_game_log_body() {
        let body = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            GAME_LOG.len(),
            GAME_LOG
        );
        let client = client_for(serve_once(Some(body)));
        let log = client.game_log(PlayerId(2544), Season::new(2024)).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].points, 16);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("playergamelog", StatusCode::TOO_MANY_REQUESTS),
            ProjectionError::SourceUnavailable(_)
        ));
        assert!(matches!(
            status_error("playergamelog", StatusCode::BAD_GATEWAY),
            ProjectionError::SourceUnavailable(_)
        ));
        assert!(matches!(
            status_error("playergamelog", StatusCode::NOT_FOUND),
            ProjectionError::SourceData(_)
        ));
    }

    #[test]
    fn test_retry_recovers_from_throttling() {
        let mut calls = 0;
        let result = with_retry(
            || {
                calls += 1;
                if calls < 3 {
                    Err(status_error("leaguedashplayerstats", StatusCode::TOO_MANY_REQUESTS))
                } else {
                    Ok(calls)
                }
            },
            3,
        );
        assert_eq!(result.unwrap(), 3);
    }
}
