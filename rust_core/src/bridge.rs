//! Delivery bridge: one remote client, one hub subscription.
//!
//! The bridge's listener serializes each payload and enqueues it on a bounded
//! channel without blocking. The transport side (SSE, websocket, ...) drains
//! the receiver. A slow client only loses its own messages.

use crate::error::{StreamError, StreamResult};
use crate::hub::Subscription;
use crate::models::{channels, BroadcastPayload, League};
use crate::transport::{PayloadListener, UpdateConsumer};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};
use uuid::Uuid;

/// Default per-client outbound queue depth
pub const DEFAULT_BRIDGE_BUFFER: usize = 32;

/// A serialized push-channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub event: &'static str,
    pub data: String,
}

struct BridgeListener {
    tx: mpsc::Sender<PushMessage>,
}

impl PayloadListener for BridgeListener {
    fn on_payload(&self, payload: &Arc<BroadcastPayload>) -> StreamResult<()> {
        let data = serde_json::to_string(payload.as_ref())?;
        self.tx
            .try_send(PushMessage {
                event: channels::UPDATE_EVENT,
                data,
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => StreamError::QueueFull,
                TrySendError::Closed(_) => StreamError::ClientGone,
            })
    }
}

pub struct DeliveryBridge {
    id: Uuid,
    league: League,
    subscription: Mutex<Option<Subscription>>,
}

impl DeliveryBridge {
    /// Subscribe a new client to `league`.
    ///
    /// Returns the bridge and the receiver the transport should drain. If the
    /// hub already has a payload it is queued before this returns.
    pub fn connect(
        consumer: &dyn UpdateConsumer,
        league: League,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<PushMessage>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let subscription = consumer.subscribe(league, Arc::new(BridgeListener { tx }));
        let id = Uuid::new_v4();

        info!(
            "Bridge {} connected to {} (subscription {})",
            id,
            league,
            subscription.id()
        );

        let bridge = Self {
            id,
            league,
            subscription: Mutex::new(Some(subscription)),
        };
        (bridge, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn league(&self) -> League {
        self.league
    }

    pub fn is_open(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Unsubscribe from the hub. Safe to call any number of times; only the
    /// first call unsubscribes. Returns true for that first call.
    pub fn close(&self) -> bool {
        let subscription = self.subscription.lock().take();
        match subscription {
            Some(mut subscription) => {
                subscription.cancel();
                info!("Bridge {} closed ({})", self.id, self.league);
                true
            }
            None => {
                debug!("Bridge {} already closed", self.id);
                false
            }
        }
    }
}

impl Drop for DeliveryBridge {
    fn drop(&mut self) {
        self.close();
    }
}
