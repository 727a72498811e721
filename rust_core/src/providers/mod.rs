//! Upstream game-data sources.
//!
//! Defines the `GameSource` trait the hub polls. Sources are I/O bound and may
//! fail at any time; the hub treats every failure as retryable.

use crate::models::{GameState, League};
use anyhow::Result;
use async_trait::async_trait;

pub mod espn;

pub use espn::EspnGameSource;

#[async_trait]
pub trait GameSource: Send + Sync {
    /// Fetch the current state of every game on the league's board
    async fn fetch_games(&self, league: League) -> Result<Vec<GameState>>;

    /// Source name for logging and debugging
    fn source_name(&self) -> &str;
}
