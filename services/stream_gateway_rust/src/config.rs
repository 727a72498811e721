//! Environment configuration for the stream gateway
//!
//! Every setting has a default; unparsable values fall back to it.

use linecast_core::providers::espn::{DEFAULT_ESPN_BASE_URL, DEFAULT_ESPN_TIMEOUT};
use linecast_core::{HubConfig, DEFAULT_BRIDGE_BUFFER};
use std::env;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default seconds between upstream polls per active league
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default seconds between SSE keep-alive comments
pub const DEFAULT_SSE_KEEPALIVE_SECS: u64 = 15;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub poll_interval: Duration,
    pub bridge_buffer: usize,
    pub espn_base_url: String,
    pub espn_timeout: Duration,
    pub redis_url: Option<String>,
    pub sse_keepalive: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let poll_interval_secs = parse_u64("POLL_INTERVAL_SECS")
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .clamp(1, 300);

        let bridge_buffer = lookup("BRIDGE_BUFFER")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_BRIDGE_BUFFER);

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            bridge_buffer,
            espn_base_url: lookup("ESPN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ESPN_BASE_URL.to_string()),
            espn_timeout: parse_u64("ESPN_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_ESPN_TIMEOUT),
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            sse_keepalive: Duration::from_secs(
                parse_u64("SSE_KEEPALIVE_SECS")
                    .filter(|s| *s > 0)
                    .unwrap_or(DEFAULT_SSE_KEEPALIVE_SECS),
            ),
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            poll_interval: self.poll_interval,
        }
    }
}
