//! Per-league stream hub.
//!
//! A hub owns the subscriber set, the poll task and the last broadcast for one
//! league. It is Idle (no subscribers, no task) or Active (at least one
//! subscriber, exactly one poll task).
//!
//! Locking:
//! - `delivery` serializes every delivery (tick broadcasts and replay on
//!   subscribe) and is always taken before `state`.
//! - `state` guards the subscriber set and stored payload; it is never held
//!   while a listener runs, so listeners may cancel their own subscription.
//! - `tick_gate` is async and held across the upstream fetch, so there is at
//!   most one fetch in flight per league.
//!
//! Listeners must not subscribe to the same hub from inside `on_payload`.

use crate::error::StreamError;
use crate::metrics::estimate;
use crate::models::{BroadcastPayload, GameMetrics, GameState, League};
use crate::providers::GameSource;
use crate::signature::signature;
use crate::transport::{PayloadListener, UpdateProducer};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default interval between upstream polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub type SubscriptionId = u64;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub poll_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of a single poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No subscribers; nothing fetched
    Idle,
    /// Upstream failed; previous payload kept
    FetchFailed,
    /// Signature matched the last broadcast
    Unchanged,
    /// Hub went idle (or restarted) while the fetch was in flight
    Superseded,
    /// Payload delivered to this many listeners
    Broadcast(usize),
}

/// Snapshot of a hub for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct HubStatus {
    pub league: League,
    pub subscribers: usize,
    pub active: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub broadcasts: u64,
    pub listener_failures: u64,
}

struct HubState {
    subscribers: BTreeMap<SubscriptionId, Arc<dyn PayloadListener>>,
    next_id: SubscriptionId,
    poller: Option<JoinHandle<()>>,
    /// Bumped on every start/stop; a tick only publishes for the epoch it began in
    epoch: u64,
    last_signature: Option<String>,
    last_payload: Option<Arc<BroadcastPayload>>,
    last_updated_at: Option<DateTime<Utc>>,
}

pub struct LeagueStreamHub {
    league: League,
    source: Arc<dyn GameSource>,
    producers: Vec<Arc<dyn UpdateProducer>>,
    config: HubConfig,
    state: Mutex<HubState>,
    delivery: Mutex<()>,
    tick_gate: tokio::sync::Mutex<()>,
    self_ref: Weak<LeagueStreamHub>,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    broadcasts: AtomicU64,
    listener_failures: AtomicU64,
}

impl LeagueStreamHub {
    pub fn new(
        league: League,
        source: Arc<dyn GameSource>,
        producers: Vec<Arc<dyn UpdateProducer>>,
        config: HubConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            league,
            source,
            producers,
            config,
            state: Mutex::new(HubState {
                subscribers: BTreeMap::new(),
                next_id: 1,
                poller: None,
                epoch: 0,
                last_signature: None,
                last_payload: None,
                last_updated_at: None,
            }),
            delivery: Mutex::new(()),
            tick_gate: tokio::sync::Mutex::new(()),
            self_ref: self_ref.clone(),
            fetches: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
        })
    }

    pub fn league(&self) -> League {
        self.league
    }

    /// Add a listener.
    ///
    /// The first subscriber starts the poll task, whose first tick runs
    /// immediately. Later subscribers get the last payload replayed before the
    /// next tick. Must be called from within a tokio runtime.
    pub fn subscribe(&self, listener: Arc<dyn PayloadListener>) -> Subscription {
        let _delivery = self.delivery.lock();

        let (id, replay) = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.insert(id, listener.clone());

            let replay = if state.poller.is_some() {
                state.last_payload.clone()
            } else {
                self.start_polling(&mut state);
                None
            };
            debug!(
                "[{}] subscription {} added ({} subscribers)",
                self.league,
                id,
                state.subscribers.len()
            );
            (id, replay)
        };

        if let Some(payload) = replay {
            self.deliver_one(id, &listener, &payload);
        }

        Subscription {
            hub: self.self_ref.clone(),
            id,
            league: self.league,
            active: true,
        }
    }

    /// Remove a listener. The last removal stops the poll task.
    ///
    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        // Dropped after the lock is released: a listener may own a Subscription
        let _removed;
        let mut state = self.state.lock();
        match state.subscribers.remove(&id) {
            Some(listener) => _removed = listener,
            None => return false,
        }

        if state.subscribers.is_empty() {
            if let Some(task) = state.poller.take() {
                task.abort();
            }
            state.epoch += 1;
            // Next activation must broadcast even if nothing changed upstream
            state.last_signature = None;
            state.last_payload = None;
            info!("[{}] last subscriber left, polling stopped", self.league);
        } else {
            debug!(
                "[{}] subscription {} removed ({} remaining)",
                self.league,
                id,
                state.subscribers.len()
            );
        }
        true
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().poller.is_some()
    }

    pub fn last_payload(&self) -> Option<Arc<BroadcastPayload>> {
        self.state.lock().last_payload.clone()
    }

    pub fn status(&self) -> HubStatus {
        let state = self.state.lock();
        HubStatus {
            league: self.league,
            subscribers: state.subscribers.len(),
            active: state.poller.is_some(),
            last_updated_at: state.last_updated_at,
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }

    /// Run one poll tick now, serialized with the timer-driven ticks.
    pub async fn tick(&self) -> TickOutcome {
        let epoch = {
            let state = self.state.lock();
            if state.subscribers.is_empty() {
                return TickOutcome::Idle;
            }
            state.epoch
        };
        self.run_tick(epoch).await
    }

    fn start_polling(&self, state: &mut HubState) {
        state.epoch += 1;
        let epoch = state.epoch;
        let weak_hub = self.self_ref.clone();
        let poll_interval = self.config.poll_interval;
        let league = self.league;

        state.poller = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // First tick completes immediately
                interval.tick().await;
                let Some(hub) = weak_hub.upgrade() else { break };
                hub.run_tick(epoch).await;
            }
            debug!("[{}] poll task exited", league);
        }));

        info!(
            "[{}] first subscriber, polling every {:?}",
            self.league, poll_interval
        );
    }

    async fn run_tick(&self, epoch: u64) -> TickOutcome {
        let _gate = self.tick_gate.lock().await;
        if self.state.lock().epoch != epoch {
            return TickOutcome::Superseded;
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        // A panicking source is a failed fetch; the poll task must survive it
        let fetched = AssertUnwindSafe(self.source.fetch_games(self.league))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(anyhow!("{} panicked during fetch", self.source.source_name()))
            });

        match fetched {
            Ok(games) => self.publish_games(epoch, games),
            Err(e) => {
                self.fetch_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[{}] {} fetch failed, keeping last payload: {:#}",
                    self.league,
                    self.source.source_name(),
                    e
                );
                TickOutcome::FetchFailed
            }
        }
    }

    fn publish_games(&self, epoch: u64, mut games: Vec<GameState>) -> TickOutcome {
        games.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        let sig = signature(&games);

        let _delivery = self.delivery.lock();
        let (payload, listeners) = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return TickOutcome::Superseded;
            }
            if state.last_signature.as_deref() == Some(sig.as_str()) {
                debug!("[{}] {} games unchanged, broadcast skipped", self.league, games.len());
                return TickOutcome::Unchanged;
            }

            let payload = Arc::new(BroadcastPayload {
                league: self.league,
                metrics: games
                    .iter()
                    .map(|game| GameMetrics {
                        game_id: game.game_id.clone(),
                        metrics: estimate(game),
                    })
                    .collect(),
                updated_at: next_timestamp(state.last_updated_at),
            });

            state.last_signature = Some(sig);
            state.last_updated_at = Some(payload.updated_at);
            state.last_payload = Some(payload.clone());

            let listeners: Vec<(SubscriptionId, Arc<dyn PayloadListener>)> = state
                .subscribers
                .iter()
                .map(|(id, listener)| (*id, listener.clone()))
                .collect();
            (payload, listeners)
        };

        for (id, listener) in &listeners {
            self.deliver_one(*id, listener, &payload);
        }
        self.broadcasts.fetch_add(1, Ordering::Relaxed);

        for producer in &self.producers {
            if let Err(e) = producer.publish(payload.clone()) {
                warn!("[{}] producer {} rejected payload: {}", self.league, producer.name(), e);
            }
        }

        debug!(
            "[{}] broadcast {} games to {} listeners",
            self.league,
            payload.metrics.len(),
            listeners.len()
        );
        TickOutcome::Broadcast(listeners.len())
    }

    /// Deliver to one listener; errors and panics stay with that listener.
    fn deliver_one(
        &self,
        id: SubscriptionId,
        listener: &Arc<dyn PayloadListener>,
        payload: &Arc<BroadcastPayload>,
    ) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| listener.on_payload(payload)))
            .unwrap_or(Err(StreamError::ListenerPanicked));

        if let Err(e) = result {
            self.listener_failures.fetch_add(1, Ordering::Relaxed);
            warn!("[{}] listener {} failed: {}", self.league, id, e);
        }
    }
}

/// Strictly increasing broadcast timestamps, even if the wall clock stalls
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + chrono::Duration::milliseconds(1),
        _ => now,
    }
}

/// Handle for one registered listener.
///
/// Holds only a weak reference to its hub. `cancel` (or drop) unsubscribes
/// exactly once.
pub struct Subscription {
    hub: Weak<LeagueStreamHub>,
    id: SubscriptionId,
    league: League,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn league(&self) -> League {
        self.league
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cancel(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("league", &self.league)
            .field("active", &self.active)
            .finish()
    }
}
