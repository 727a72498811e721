//! Linecast Core - live game-state broadcasting engine.
//!
//! This crate provides:
//! - Per-league stream hubs that poll an upstream source at most once per
//!   interval, no matter how many clients are subscribed
//! - Live metrics (win probability, projected spread/total, confidence)
//! - Change signatures so unchanged polls are never rebroadcast
//! - A hub registry and a per-client delivery bridge with bounded queues
//! - An ESPN scoreboard source and an optional Redis mirror

pub mod bridge;
pub mod error;
pub mod hub;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod redis;
pub mod registry;
pub mod signature;
pub mod transport;

pub use bridge::{DeliveryBridge, PushMessage, DEFAULT_BRIDGE_BUFFER};
pub use error::{StreamError, StreamResult};
pub use hub::{HubConfig, HubStatus, LeagueStreamHub, Subscription, TickOutcome};
pub use models::{
    BroadcastPayload, Confidence, GameMetrics, GameState, GameStatus, League, LiveMetrics,
};
pub use providers::{EspnGameSource, GameSource};
pub use crate::redis::RedisUpdateProducer;
pub use registry::HubRegistry;
pub use transport::{PayloadListener, UpdateConsumer, UpdateProducer};
