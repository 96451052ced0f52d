use std::time::Duration;

use clap::ValueEnum;
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, REFERER, USER_AGENT};
use reqwest::StatusCode;

use super::error::FetchError;
use super::model::{parse_result_set, GameLog, PlayerIndex, ResultSet};
use crate::roster::Season;

pub const DEFAULT_BASE_URL: &str = "https://stats.nba.com/stats";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeasonType {
    Regular,
    Playoffs,
}

impl SeasonType {
    fn as_param(&self) -> &'static str {
        match self {
            SeasonType::Regular => "Regular Season",
            SeasonType::Playoffs => "Playoffs",
        }
    }
}

/// Blocking client for the stats.nba.com JSON API.
pub struct StatsClient {
    base_url: String,
    client: Client,
}

impl StatsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<StatsClient, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(StatsClient {
            base_url: base_url.into(),
            client,
        })
    }

    /// The endpoint rejects anything that does not look like a browser tab
    /// on stats.nba.com, hence the header spoofing.
    fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} {:?}", url, params);
        let response = self
            .client
            .get(&url)
            .query(params)
            .header(USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36")
            .header(ACCEPT, "application/json")
            .header(REFERER, "https://stats.nba.com/")
            .header("x-nba-stats-origin", "stats")
            .header("x-nba-stats-token", "true")
            .send()?;
        match response.status() {
            StatusCode::OK => Ok(response.text()?),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            status => Err(FetchError::Status(status.as_u16())),
        }
    }

    /// Download the full name-to-id index (`commonallplayers`). One request
    /// per run; the season parameter is required by the endpoint but the
    /// index always covers all historical players.
    pub fn player_index(&self, season: Season) -> Result<PlayerIndex, FetchError> {
        let body = self.get(
            "commonallplayers",
            &[
                ("LeagueID", "00".to_string()),
                ("Season", season.to_string()),
                ("IsOnlyCurrentSeason", "0".to_string()),
            ],
        )?;
        let rs = parse_result_set(&body, "CommonAllPlayers")?;
        PlayerIndex::from_result_set(&rs)
    }

    /// One (player, season) game log. An empty log is reported as a failure,
    /// same as the roster scripts this feeds.
    pub fn player_game_log(
        &self,
        player_id: i64,
        season: Season,
        season_type: SeasonType,
    ) -> Result<GameLog, FetchError> {
        let body = self.get(
            "playergamelog",
            &[
                ("PlayerID", player_id.to_string()),
                ("Season", season.to_string()),
                ("SeasonType", season_type.as_param().to_string()),
                ("LeagueID", "00".to_string()),
            ],
        )?;
        let rs = parse_result_set(&body, "PlayerGameLog")?;
        if rs.row_set.is_empty() {
            return Err(FetchError::EmptyLog);
        }
        Ok(GameLog {
            headers: rs.headers,
            rows: rs.row_set,
        })
    }

    /// Biographical / draft data for one player. Returns the parsed result
    /// set together with the raw body so the caller can archive the JSON.
    pub fn common_player_info(&self, player_id: i64) -> Result<(ResultSet, String), FetchError> {
        let body = self.get(
            "commonplayerinfo",
            &[
                ("PlayerID", player_id.to_string()),
                ("LeagueID", "00".to_string()),
            ],
        )?;
        let rs = parse_result_set(&body, "CommonPlayerInfo")?;
        Ok((rs, body))
    }
}
