//! Hub Registry
//!
//! Owns one `LeagueStreamHub` per league, created lazily on first use and kept
//! for the registry's lifetime. The registry is an ordinary value owned by the
//! application context; nothing here is global.

use crate::hub::{HubConfig, HubStatus, LeagueStreamHub, Subscription};
use crate::models::League;
use crate::providers::GameSource;
use crate::transport::{PayloadListener, UpdateConsumer, UpdateProducer};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::info;

pub struct HubRegistry {
    source: Arc<dyn GameSource>,
    producers: Vec<Arc<dyn UpdateProducer>>,
    config: HubConfig,
    hubs: RwLock<FxHashMap<League, Arc<LeagueStreamHub>>>,
}

impl HubRegistry {
    pub fn new(source: Arc<dyn GameSource>, config: HubConfig) -> Self {
        Self {
            source,
            producers: Vec::new(),
            config,
            hubs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Attach a producer to every hub created after this call
    pub fn with_producer(mut self, producer: Arc<dyn UpdateProducer>) -> Self {
        info!("Registering update producer: {}", producer.name());
        self.producers.push(producer);
        self
    }

    /// Get the hub for `league`, creating it on first access.
    ///
    /// Concurrent first calls for the same league all receive the same hub.
    pub fn get_or_create(&self, league: League) -> Arc<LeagueStreamHub> {
        if let Some(hub) = self.hubs.read().get(&league) {
            return hub.clone();
        }

        let mut hubs = self.hubs.write();
        hubs.entry(league)
            .or_insert_with(|| {
                info!(
                    "Creating stream hub for {} (source={})",
                    league,
                    self.source.source_name()
                );
                LeagueStreamHub::new(
                    league,
                    self.source.clone(),
                    self.producers.clone(),
                    self.config.clone(),
                )
            })
            .clone()
    }

    /// Existing hub for `league`, without creating one
    pub fn get(&self, league: League) -> Option<Arc<LeagueStreamHub>> {
        self.hubs.read().get(&league).cloned()
    }

    pub fn hub_count(&self) -> usize {
        self.hubs.read().len()
    }

    /// Status of every hub created so far, ordered by league
    pub fn status(&self) -> Vec<HubStatus> {
        let hubs: Vec<Arc<LeagueStreamHub>> = self.hubs.read().values().cloned().collect();
        let mut statuses: Vec<HubStatus> = hubs.iter().map(|hub| hub.status()).collect();
        statuses.sort_by_key(|s| s.league);
        statuses
    }
}

impl UpdateConsumer for HubRegistry {
    fn subscribe(&self, league: League, listener: Arc<dyn PayloadListener>) -> Subscription {
        self.get_or_create(league).subscribe(listener)
    }
}
