// Shared models for the Linecast broadcasting engine
use crate::error::StreamError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Channel names (message bus mirror)
// ============================================================================

pub mod channels {
    use super::League;

    /// Push-channel event name for every metrics update
    pub const UPDATE_EVENT: &str = "update";

    /// Bus channel a league's payloads are mirrored to: `linecast:{league}:update`
    pub fn league_update(league: League) -> String {
        format!("linecast:{}:update", league.as_str())
    }
}

// ============================================================================
// League & Status Enums
// ============================================================================

/// Partition key for independent game-state streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    NFL,
    NCAAF,
}

impl League {
    pub const ALL: [League; 2] = [League::NFL, League::NCAAF];

    pub fn as_str(&self) -> &'static str {
        match self {
            League::NFL => "nfl",
            League::NCAAF => "ncaaf",
        }
    }

    /// ESPN (sport, league) path segments for the scoreboard endpoint
    pub fn espn_path(&self) -> (&'static str, &'static str) {
        match self {
            League::NFL => ("football", "nfl"),
            League::NCAAF => ("football", "college-football"),
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for League {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nfl" => Ok(League::NFL),
            "ncaaf" | "college-football" => Ok(League::NCAAF),
            other => Err(StreamError::UnknownLeague(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Scheduled,
    Live,
    Final,
}

// ============================================================================
// Game State (upstream snapshot)
// ============================================================================

/// Snapshot of one game as reported by the upstream feed on a single poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: String,
    pub league: League,
    pub status: GameStatus,
    /// Free-form status line from the feed, e.g. "3rd Quarter" or "Q3 5:00"
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    pub home_score: u16,
    pub away_score: u16,
    #[serde(default)]
    pub period: Option<u8>,
    #[serde(default)]
    pub clock_text: Option<String>,
    #[serde(default)]
    pub opening_spread_home: Option<f64>,
    #[serde(default)]
    pub total_line: Option<f64>,
    #[serde(default)]
    pub possession_team: Option<String>,
    #[serde(default)]
    pub down_distance_text: Option<String>,
    /// When the upstream last changed this game, if the feed reports it
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl GameState {
    /// Minimal state with no odds or situation data
    pub fn new(game_id: impl Into<String>, league: League, status: GameStatus) -> Self {
        Self {
            game_id: game_id.into(),
            league,
            status,
            status_detail: None,
            home_team: String::new(),
            away_team: String::new(),
            home_score: 0,
            away_score: 0,
            period: None,
            clock_text: None,
            opening_spread_home: None,
            total_line: None,
            possession_team: None,
            down_distance_text: None,
            last_updated: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == GameStatus::Live
    }
}

// ============================================================================
// Derived Metrics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Ordinal where higher means more confident
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::Low => 0,
            Confidence::Medium => 1,
            Confidence::High => 2,
        }
    }
}

/// Live analytics derived from a single `GameState`.
///
/// `home_win_probability + away_win_probability == 1.0`, both in `[0.01, 0.99]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMetrics {
    pub home_win_probability: f64,
    pub away_win_probability: f64,
    pub projected_spread: f64,
    pub projected_total: f64,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetrics {
    pub game_id: String,
    pub metrics: LiveMetrics,
}

// ============================================================================
// Broadcast Payload (push-channel body)
// ============================================================================

/// One payload per successful, changed poll tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
    pub league: League,
    pub metrics: Vec<GameMetrics>,
    pub updated_at: DateTime<Utc>,
}
