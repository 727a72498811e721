//! Producer / consumer seams around the hub.
//!
//! - `PayloadListener`: what a subscriber hands the hub. Called synchronously on
//!   every broadcast, so implementations must not block.
//! - `UpdateConsumer`: the subscribe side. `HubRegistry` is the in-memory
//!   implementation.
//! - `UpdateProducer`: an outbound mirror that receives every broadcast without
//!   counting as a subscriber (e.g. `RedisUpdateProducer`).

use crate::error::StreamResult;
use crate::hub::Subscription;
use crate::models::{BroadcastPayload, League};
use std::sync::Arc;

/// Receives every broadcast for the league it subscribed to.
///
/// `on_payload` runs on the hub's delivery path, one listener after another,
/// and holds up every other listener and new subscriber while it runs. It must
/// return promptly: hand the payload to a queue (as `DeliveryBridge` does with
/// `try_send`) rather than doing I/O inline. It must not subscribe to the same
/// hub; cancelling its own `Subscription` is allowed. An `Err` or a panic is
/// logged and counted against this listener only.
pub trait PayloadListener: Send + Sync {
    fn on_payload(&self, payload: &Arc<BroadcastPayload>) -> StreamResult<()>;
}

impl<F> PayloadListener for F
where
    F: Fn(&Arc<BroadcastPayload>) -> StreamResult<()> + Send + Sync,
{
    fn on_payload(&self, payload: &Arc<BroadcastPayload>) -> StreamResult<()> {
        self(payload)
    }
}

pub trait UpdateConsumer: Send + Sync {
    /// Register `listener` for `league`; the returned handle unsubscribes on
    /// cancel or drop.
    fn subscribe(&self, league: League, listener: Arc<dyn PayloadListener>) -> Subscription;
}

pub trait UpdateProducer: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    /// Hand off a payload. Must not block; slow transports buffer internally.
    fn publish(&self, payload: Arc<BroadcastPayload>) -> StreamResult<()>;
}
