use crate::error::{StreamError, StreamResult};
use crate::models::{channels, BroadcastPayload};
use crate::transport::UpdateProducer;
use anyhow::{Context, Result};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Payloads queued for Redis before new ones are dropped
pub const DEFAULT_MIRROR_BUFFER: usize = 256;

/// Mirrors every broadcast onto `linecast:{league}:update`.
///
/// `publish` only enqueues; a background task owns the connection and does
/// the network I/O, so a slow Redis never stalls a hub tick.
pub struct RedisUpdateProducer {
    tx: mpsc::Sender<Arc<BroadcastPayload>>,
    forwarder: JoinHandle<()>,
}

impl RedisUpdateProducer {
    pub async fn connect(redis_url: &str, buffer: usize) -> Result<Self> {
        let client = Client::open(redis_url).context("Invalid Redis URL")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Redis mirror connected");
        Ok(Self::spawn(connection, buffer))
    }

    fn spawn(mut connection: ConnectionManager, buffer: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Arc<BroadcastPayload>>(buffer.max(1));

        let forwarder = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                let (channel, message) = match encode(&payload) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        warn!("Failed to encode {} payload for Redis: {}", payload.league, e);
                        continue;
                    }
                };

                if let Err(e) = connection.publish::<_, _, ()>(&channel, message).await {
                    warn!("Failed to publish to {}: {}", channel, e);
                }
            }
            debug!("Redis mirror forwarder stopped");
        });

        Self { tx, forwarder }
    }
}

/// Channel name and JSON body for one payload
fn encode(payload: &BroadcastPayload) -> StreamResult<(String, String)> {
    let message = serde_json::to_string(payload)?;
    Ok((channels::league_update(payload.league), message))
}

impl UpdateProducer for RedisUpdateProducer {
    fn name(&self) -> &str {
        "redis"
    }

    fn publish(&self, payload: Arc<BroadcastPayload>) -> StreamResult<()> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => StreamError::QueueFull,
            TrySendError::Closed(_) => StreamError::ClientGone,
        })
    }
}

impl Drop for RedisUpdateProducer {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
