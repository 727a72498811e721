//! ESPN scoreboard source
//!
//! Polls the public site API scoreboard for a league and maps each event to a
//! `GameState`. Events the feed reports without an id are skipped.

use super::GameSource;
use crate::models::{GameState, GameStatus, League};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ESPN_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";
pub const DEFAULT_ESPN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct EspnGameSource {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for EspnGameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EspnGameSource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for EspnGameSource {
    fn default() -> Self {
        Self::new(DEFAULT_ESPN_BASE_URL, DEFAULT_ESPN_TIMEOUT)
    }
}

impl EspnGameSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn scoreboard_url(&self, league: League) -> String {
        let (sport, path) = league.espn_path();
        format!("{}/{}/{}/scoreboard", self.base_url, sport, path)
    }
}

#[async_trait]
impl GameSource for EspnGameSource {
    async fn fetch_games(&self, league: League) -> Result<Vec<GameState>> {
        let url = self.scoreboard_url(league);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("ESPN request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("ESPN returned an error status: {}", url))?;

        let data: Value = resp
            .json()
            .await
            .context("ESPN scoreboard body was not valid JSON")?;

        let games = parse_scoreboard(&data, league);
        debug!("ESPN {} scoreboard: {} games", league, games.len());
        Ok(games)
    }

    fn source_name(&self) -> &str {
        "espn"
    }
}

/// Map a scoreboard response body to game states, in feed order
pub fn parse_scoreboard(data: &Value, league: League) -> Vec<GameState> {
    let Some(events) = data["events"].as_array() else {
        return Vec::new();
    };

    events
        .iter()
        .filter_map(|event| {
            let game = parse_event(event, league);
            if game.is_none() {
                debug!("Skipping ESPN event without id");
            }
            game
        })
        .collect()
}

fn parse_event(event: &Value, league: League) -> Option<GameState> {
    let id = event["id"].as_str().filter(|id| !id.is_empty())?;

    let competition = &event["competitions"][0];
    let status_obj = if event["status"].is_object() {
        &event["status"]
    } else {
        &competition["status"]
    };

    let status_type = &status_obj["type"];
    let mut game = GameState::new(
        id,
        league,
        parse_status_state(status_type["state"].as_str().unwrap_or("pre")),
    );

    game.status_detail = status_type["shortDetail"]
        .as_str()
        .or_else(|| status_type["detail"].as_str())
        .map(str::to_string);
    game.period = status_obj["period"]
        .as_u64()
        .and_then(|p| u8::try_from(p).ok())
        .filter(|p| *p > 0);
    game.clock_text = status_obj["displayClock"].as_str().map(str::to_string);

    // Team id -> abbreviation, for resolving possession
    let mut abbreviations: Vec<(String, String)> = Vec::new();

    if let Some(competitors) = competition["competitors"].as_array() {
        for comp in competitors {
            let team = &comp["team"];
            let name = team["displayName"]
                .as_str()
                .or_else(|| team["abbreviation"].as_str())
                .unwrap_or_default()
                .to_string();
            let score = parse_score(&comp["score"]);

            if let (Some(team_id), Some(abbr)) = (team["id"].as_str(), team["abbreviation"].as_str())
            {
                abbreviations.push((team_id.to_string(), abbr.to_string()));
            }

            if comp["homeAway"].as_str() == Some("home") {
                game.home_team = name;
                game.home_score = score;
            } else {
                game.away_team = name;
                game.away_score = score;
            }
        }
    }

    let odds = &competition["odds"][0];
    game.opening_spread_home = parse_number(&odds["spread"]);
    game.total_line = parse_number(&odds["overUnder"]);

    let situation = &competition["situation"];
    game.possession_team = situation["possession"].as_str().map(|team_id| {
        abbreviations
            .iter()
            .find(|(id, _)| id == team_id)
            .map(|(_, abbr)| abbr.clone())
            .unwrap_or_else(|| team_id.to_string())
    });
    game.down_distance_text = situation["downDistanceText"].as_str().map(str::to_string);

    Some(game)
}

fn parse_status_state(state: &str) -> GameStatus {
    match state {
        "in" => GameStatus::Live,
        "post" => GameStatus::Final,
        _ => GameStatus::Scheduled,
    }
}

/// Scores arrive as strings on the scoreboard, numbers on some other feeds
fn parse_score(value: &Value) -> u16 {
    value
        .as_str()
        .and_then(|s| s.parse::<u16>().ok())
        .or_else(|| value.as_u64().and_then(|n| u16::try_from(n).ok()))
        .unwrap_or(0)
}

fn parse_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|n| n.is_finite())
}
