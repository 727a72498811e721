//! Change signatures for broadcast suppression.
//!
//! A signature fingerprints a reduced projection of each game (id, status,
//! scores, upstream update time). Odds, clock and situation fields are not part
//! of the projection, so movement in those alone never triggers a rebroadcast.

use crate::models::{GameState, GameStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Projection<'a> {
    id: &'a str,
    status: GameStatus,
    home_score: u16,
    away_score: u16,
    last_update_timestamp: Option<DateTime<Utc>>,
}

impl<'a> From<&'a GameState> for Projection<'a> {
    fn from(game: &'a GameState) -> Self {
        Self {
            id: &game.game_id,
            status: game.status,
            home_score: game.home_score,
            away_score: game.away_score,
            last_update_timestamp: game.last_updated,
        }
    }
}

/// Deterministic, order-sensitive fingerprint of a game list.
///
/// Callers supply a stable ordering (the hub sorts by game id).
pub fn signature(games: &[GameState]) -> String {
    let mut hasher = Sha256::new();
    for game in games {
        // Projection holds only plain fields; serialization cannot fail
        if let Ok(bytes) = serde_json::to_vec(&Projection::from(game)) {
            hasher.update(&bytes);
        }
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::League;

    fn game(id: &str, home: u16, away: u16) -> GameState {
        let mut g = GameState::new(id, League::NFL, GameStatus::Live);
        g.home_score = home;
        g.away_score = away;
        g
    }

    #[test]
    fn test_identical_projections_match() {
        let a = vec![game("1", 7, 3), game("2", 0, 0)];
        let b = vec![game("1", 7, 3), game("2", 0, 0)];
        assert_eq!(signature(&a), signature(&b));
    }

    #[test]
    fn test_odds_and_clock_movement_ignored() {
        let base = vec![game("1", 7, 3)];
        let mut moved = base.clone();
        moved[0].opening_spread_home = Some(-6.5);
        moved[0].total_line = Some(51.0);
        moved[0].clock_text = Some("4:12".to_string());
        moved[0].down_distance_text = Some("2nd & 8".to_string());
        assert_eq!(signature(&base), signature(&moved));
    }

    #[test]
    fn test_score_status_and_timestamp_changes_detected() {
        let base = vec![game("1", 7, 3)];

        let mut scored = base.clone();
        scored[0].home_score = 10;
        assert_ne!(signature(&base), signature(&scored));

        let mut finished = base.clone();
        finished[0].status = GameStatus::Final;
        assert_ne!(signature(&base), signature(&finished));

        let mut touched = base.clone();
        touched[0].last_updated = Some("2025-01-05T18:00:00Z".parse().unwrap());
        assert_ne!(signature(&base), signature(&touched));
    }

    #[test]
    fn test_order_sensitive() {
        let a = vec![game("1", 7, 3), game("2", 0, 0)];
        let b = vec![game("2", 0, 0), game("1", 7, 3)];
        assert_ne!(signature(&a), signature(&b));
    }

    #[test]
    fn test_empty_list_is_stable_hex() {
        let sig = signature(&[]);
        assert_eq!(sig, signature(&[]));
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
