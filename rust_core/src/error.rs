//! Error types for the broadcasting engine.
//!
//! Upstream and transport I/O use `anyhow::Result`; these are the failures the
//! library itself reports.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("unknown league: {0}")]
    UnknownLeague(String),

    /// Client outbound queue is full; the payload was dropped for that client
    #[error("client queue full, payload dropped")]
    QueueFull,

    /// Client side of the delivery channel is gone
    #[error("client disconnected")]
    ClientGone,

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("listener panicked during delivery")]
    ListenerPanicked,
}

pub type StreamResult<T> = std::result::Result<T, StreamError>;
