//! Live metrics estimation for in-progress football games.
//!
//! The model is a single logistic curve over the score margin relative to the
//! opening spread, flattened early in the game and sharpened as the clock runs
//! down. It is pure and total: every missing or malformed input has a numeric
//! default, so `estimate` never fails.

use crate::models::{Confidence, GameState, LiveMetrics};

/// Regulation length: four 15-minute quarters
const REGULATION_SECONDS: f64 = 3600.0;
const QUARTER_SECONDS: i64 = 900;
const REGULATION_PERIODS: i64 = 4;

const DEFAULT_TOTAL_LINE: f64 = 45.0;
const LOGISTIC_SLOPE: f64 = 0.35;
const MIN_TIME_FACTOR: f64 = 0.05;
const PROB_FLOOR: f64 = 0.01;
const PROB_CEIL: f64 = 0.99;

/// Volatility above which confidence drops to low / medium
const LOW_CONFIDENCE_VOLATILITY: f64 = 10.0;
const MEDIUM_CONFIDENCE_VOLATILITY: f64 = 5.0;

/// Logistic function for probability calculation
#[inline]
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derive live metrics from a game snapshot.
pub fn estimate(game: &GameState) -> LiveMetrics {
    let seconds_remaining = seconds_remaining(game);
    let time_ratio = seconds_remaining as f64 / REGULATION_SECONDS;

    let score_diff = game.home_score as f64 - game.away_score as f64;
    let base_spread = finite_or(game.opening_spread_home, 0.0);
    let base_total = finite_or(game.total_line, DEFAULT_TOTAL_LINE);

    let spread_adjustment = score_diff - base_spread;
    let spread_volatility = spread_adjustment.abs().max(1.0);
    let time_factor = time_ratio.powf(0.75).max(MIN_TIME_FACTOR);

    let home_win_probability = logistic(LOGISTIC_SLOPE * spread_adjustment / (time_factor * 5.0).max(1.0))
        .clamp(PROB_FLOOR, PROB_CEIL);

    LiveMetrics {
        home_win_probability,
        away_win_probability: 1.0 - home_win_probability,
        projected_spread: score_diff + base_spread * time_ratio,
        projected_total: (game.home_score as f64 + game.away_score as f64) + base_total * time_ratio,
        confidence: confidence_for(spread_volatility),
        drive_summary: drive_summary(game),
    }
}

/// Seconds left in regulation.
///
/// Non-live games are treated as fully resolved: period 4, 3600 seconds.
pub fn seconds_remaining(game: &GameState) -> u32 {
    if !game.is_live() {
        return REGULATION_SECONDS as u32;
    }

    let period = current_period(game);
    let whole_quarters_left = (REGULATION_PERIODS - period) * QUARTER_SECONDS;

    let remaining = match game.clock_text.as_deref().and_then(parse_clock) {
        Some(clock_secs) => whole_quarters_left + clock_secs,
        None => whole_quarters_left,
    };

    u32::try_from(remaining.max(0)).unwrap_or(u32::MAX)
}

/// Period from the structured field, falling back to the status text, then 4
fn current_period(game: &GameState) -> i64 {
    game.period
        .filter(|p| *p > 0)
        .map(i64::from)
        .or_else(|| game.status_detail.as_deref().and_then(parse_period_text))
        .unwrap_or(REGULATION_PERIODS)
}

/// Period from a status line like "3rd Quarter", "Q2 4:12" or "5:00 - 3rd".
/// Clock tokens are skipped; the first remaining number wins.
fn parse_period_text(text: &str) -> Option<i64> {
    text.split(|c: char| c.is_whitespace() || c == '-' || c == ',')
        .filter(|token| !token.contains(':'))
        .find_map(|token| {
            let digits: String = token
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<i64>().ok().filter(|p| *p > 0)
        })
}

/// Parse a "MM:SS" game clock into seconds. Anything else, including a clock
/// longer than one quarter or seconds past 59, is malformed.
fn parse_clock(clock: &str) -> Option<i64> {
    let (mins, secs) = clock.trim().split_once(':')?;
    let mins = mins.trim().parse::<u32>().ok()?;
    let secs = secs.trim().parse::<u32>().ok()?;
    if secs >= 60 {
        return None;
    }
    let total = i64::from(mins) * 60 + i64::from(secs);
    (total <= QUARTER_SECONDS).then_some(total)
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}

fn confidence_for(spread_volatility: f64) -> Confidence {
    if spread_volatility > LOW_CONFIDENCE_VOLATILITY {
        Confidence::Low
    } else if spread_volatility > MEDIUM_CONFIDENCE_VOLATILITY {
        Confidence::Medium
    } else {
        Confidence::High
    }
}

fn drive_summary(game: &GameState) -> Option<String> {
    let team = game.possession_team.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
    let down = game.down_distance_text.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
    Some(format!("{} ball – {}", team, down))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameStatus, League};

    fn make_live_state(
        home_score: u16,
        away_score: u16,
        period: u8,
        clock: &str,
        spread: Option<f64>,
    ) -> GameState {
        let mut state = GameState::new("test", League::NFL, GameStatus::Live);
        state.home_score = home_score;
        state.away_score = away_score;
        state.period = Some(period);
        state.clock_text = Some(clock.to_string());
        state.opening_spread_home = spread;
        state.total_line = Some(45.0);
        state
    }

    #[test]
    fn test_worked_example_third_quarter() {
        let state = make_live_state(10, 7, 3, "5:00", Some(-3.0));

        assert_eq!(seconds_remaining(&state), 1200);

        let metrics = estimate(&state);
        assert!(
            metrics.home_win_probability > 0.5,
            "Home should be favored: {:.3}",
            metrics.home_win_probability
        );
        assert_eq!(metrics.confidence, Confidence::Medium);
        // 3 + (-3 * 1/3)
        assert!((metrics.projected_spread - 2.0).abs() < 1e-9);
        // 17 + 45 * 1/3
        assert!((metrics.projected_total - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_probabilities_sum_to_one_and_stay_clamped() {
        for home in [0u16, 3, 7, 14, 21, 35, 56] {
            for away in [0u16, 3, 10, 28, 49] {
                for period in 1u8..=5 {
                    for clock in ["15:00", "7:30", "0:01", "0:00", "garbage"] {
                        for spread in [None, Some(-14.5), Some(-3.0), Some(0.0), Some(10.0)] {
                            let state = make_live_state(home, away, period, clock, spread);
                            let m = estimate(&state);
                            assert!((m.home_win_probability + m.away_win_probability - 1.0).abs() < 1e-12);
                            assert!((0.01..=0.99).contains(&m.home_win_probability));
                            assert!((0.01..=0.99).contains(&m.away_win_probability));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_confidence_never_increases_with_larger_adjustment() {
        // Spread fixed at 0, so adjustment == score diff; time held at Q2 8:00
        let mut previous = Confidence::High;
        for margin in 0u16..=40 {
            let state = make_live_state(margin, 0, 2, "8:00", Some(0.0));
            let current = estimate(&state).confidence;
            assert!(
                current.rank() <= previous.rank(),
                "Confidence rose from {:?} to {:?} at margin {}",
                previous,
                current,
                margin
            );
            previous = current;
        }
        assert_eq!(previous, Confidence::Low);
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(estimate(&make_live_state(5, 0, 1, "15:00", Some(0.0))).confidence, Confidence::High);
        assert_eq!(estimate(&make_live_state(6, 0, 1, "15:00", Some(0.0))).confidence, Confidence::Medium);
        assert_eq!(estimate(&make_live_state(10, 0, 1, "15:00", Some(0.0))).confidence, Confidence::Medium);
        assert_eq!(estimate(&make_live_state(11, 0, 1, "15:00", Some(0.0))).confidence, Confidence::Low);
    }

    #[test]
    fn test_non_live_treated_as_resolved() {
        let mut state = make_live_state(24, 17, 2, "3:00", Some(-3.0));
        state.status = GameStatus::Final;
        assert_eq!(seconds_remaining(&state), 3600);

        state.status = GameStatus::Scheduled;
        assert_eq!(seconds_remaining(&state), 3600);
    }

    #[test]
    fn test_malformed_clock_falls_back_to_whole_quarters() {
        let state = make_live_state(0, 0, 2, "halftime", None);
        assert_eq!(seconds_remaining(&state), 1800);

        let mut missing = make_live_state(0, 0, 3, "", None);
        missing.clock_text = None;
        assert_eq!(seconds_remaining(&missing), 900);
    }

    #[test]
    fn test_overtime_never_negative() {
        let state = make_live_state(20, 20, 5, "8:00", None);
        // (4 - 5) * 900 + 480 < 0
        assert_eq!(seconds_remaining(&state), 0);
        let m = estimate(&state);
        assert!((m.home_win_probability - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_period_parsed_from_status_text() {
        let mut state = make_live_state(0, 0, 1, "10:00", None);
        state.period = None;
        state.status_detail = Some("3rd Quarter".to_string());
        assert_eq!(seconds_remaining(&state), 900 + 600);

        state.status_detail = Some("5:00 - 2nd".to_string());
        assert_eq!(seconds_remaining(&state), 1800 + 600);

        state.status_detail = Some("Halftime".to_string());
        // Unparsable -> period 4
        assert_eq!(seconds_remaining(&state), 600);
    }

    #[test]
    fn test_missing_odds_use_defaults() {
        let mut state = make_live_state(7, 0, 2, "15:00", None);
        state.total_line = None;
        let m = estimate(&state);
        // ratio = 2700 / 3600 = 0.75
        assert!((m.projected_spread - 7.0).abs() < 1e-9);
        assert!((m.projected_total - (7.0 + 45.0 * 0.75)).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_odds_ignored() {
        let mut state = make_live_state(7, 3, 2, "15:00", Some(f64::NAN));
        state.total_line = Some(f64::INFINITY);
        let m = estimate(&state);
        assert!(m.projected_spread.is_finite());
        assert!(m.projected_total.is_finite());
        assert!(m.home_win_probability.is_finite());
    }

    #[test]
    fn test_leader_gains_probability_as_clock_runs() {
        let early = estimate(&make_live_state(14, 7, 1, "15:00", Some(0.0)));
        let late = estimate(&make_live_state(14, 7, 4, "2:00", Some(0.0)));
        assert!(late.home_win_probability > early.home_win_probability);
    }

    #[test]
    fn test_drive_summary_requires_both_parts() {
        let mut state = make_live_state(0, 0, 1, "12:00", None);
        assert_eq!(estimate(&state).drive_summary, None);

        state.possession_team = Some("KC".to_string());
        assert_eq!(estimate(&state).drive_summary, None);

        state.down_distance_text = Some("3rd & 4 at KC 35".to_string());
        assert_eq!(
            estimate(&state).drive_summary.as_deref(),
            Some("KC ball – 3rd & 4 at KC 35")
        );

        state.possession_team = Some("  ".to_string());
        assert_eq!(estimate(&state).drive_summary, None);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("12:34"), Some(754));
        assert_eq!(parse_clock("5:00"), Some(300));
        assert_eq!(parse_clock(" 0:07 "), Some(7));
        assert_eq!(parse_clock("300"), None);
        assert_eq!(parse_clock("a:b"), None);
        assert_eq!(parse_clock("-1:00"), None);
        assert_eq!(parse_clock("15:00"), Some(900));
        assert_eq!(parse_clock("15:01"), None);
        assert_eq!(parse_clock("4:75"), None);
    }

    #[test]
    fn test_oversized_clock_falls_back_to_whole_quarters() {
        let state = make_live_state(0, 0, 2, "71582789:00", None);
        assert_eq!(seconds_remaining(&state), 1800);

        let state = make_live_state(0, 0, 3, "99:00", None);
        assert_eq!(seconds_remaining(&state), 900);
    }
}
