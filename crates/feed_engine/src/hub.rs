//! Broadcast hub fanning price updates out to subscribers.
//!
//! Every subscriber owns a bounded queue and an instrument filter. Publishing
//! never blocks: each matching queue gets a `try_send`, and a full queue is
//! handled by the configured [`DropPolicy`]. Receivers that went away are
//! pruned on the next publish.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use infra_store::PriceStore;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::events::PriceUpdate;

/// What to do with an update when a subscriber's queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Skip the update for that subscriber.
    #[default]
    DropNewest,
    /// Remove the subscriber; its stream ends once drained.
    Disconnect,
}

/// Hub configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Queue capacity per subscriber
    pub queue_capacity: usize,
    /// Overflow policy
    pub drop_policy: DropPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            drop_policy: DropPolicy::default(),
        }
    }
}

/// Counters over the lifetime of a hub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
    /// Times a subscriber queue went from accepting to full
    pub saturations: u64,
    pub disconnected: u64,
    pub subscribers: usize,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    saturations: AtomicU64,
    disconnected: AtomicU64,
}

#[derive(Debug)]
struct Subscriber {
    filter: HashSet<String>,
    queue: mpsc::Sender<PriceUpdate>,
    /// Set while the queue is full; updates are dropped without logging.
    saturated: AtomicBool,
    /// Drops since the queue became full
    missed: AtomicU64,
}

impl Subscriber {
    fn new(filter: HashSet<String>, queue: mpsc::Sender<PriceUpdate>) -> Self {
        Self {
            filter,
            queue,
            saturated: AtomicBool::new(false),
            missed: AtomicU64::new(0),
        }
    }

    fn matches(&self, instrument: &str) -> bool {
        self.filter.is_empty() || self.filter.contains(instrument)
    }
}

type Registry = DashMap<u64, Subscriber>;

/// Fan-out point between the scheduler and connected subscribers.
pub struct BroadcastHub {
    config: HubConfig,
    prices: Arc<dyn PriceStore>,
    subscribers: Arc<Registry>,
    next_id: AtomicU64,
    counters: Counters,
}

impl BroadcastHub {
    pub fn new(config: HubConfig, prices: Arc<dyn PriceStore>) -> Self {
        Self {
            config,
            prices,
            subscribers: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Registers a subscriber for the given instruments. An empty filter
    /// matches every instrument.
    pub fn subscribe<I, S>(&self, instruments: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let filter: HashSet<String> = instruments.into_iter().map(Into::into).collect();
        let (queue, receiver) = mpsc::channel(self.config.queue_capacity.max(1));

        debug!(subscriber = id, instruments = filter.len(), "Subscriber registered");
        self.subscribers.insert(id, Subscriber::new(filter, queue));

        Subscription {
            id,
            receiver,
            registry: Arc::clone(&self.subscribers),
        }
    }

    /// Delivers an update to every matching subscriber without waiting.
    ///
    /// Returns the number of queues the update was placed on.
    pub fn publish(&self, update: PriceUpdate) -> usize {
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        let mut removed = Vec::new();

        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if !subscriber.matches(&update.instrument) {
                continue;
            }
            match subscriber.queue.try_send(update.clone()) {
                Ok(()) => {
                    delivered += 1;
                    if subscriber.saturated.swap(false, Ordering::Relaxed) {
                        let missed = subscriber.missed.swap(0, Ordering::Relaxed);
                        info!(subscriber = *entry.key(), missed, "Subscriber caught up");
                    }
                }
                Err(mpsc::error::TrySendError::Full(_)) => match self.config.drop_policy {
                    DropPolicy::DropNewest => {
                        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                        subscriber.missed.fetch_add(1, Ordering::Relaxed);
                        if !subscriber.saturated.swap(true, Ordering::Relaxed) {
                            self.counters.saturations.fetch_add(1, Ordering::Relaxed);
                            warn!(
                                subscriber = *entry.key(),
                                instrument = %update.instrument,
                                "Subscriber queue full, dropping updates until it drains"
                            );
                        }
                    }
                    DropPolicy::Disconnect => {
                        warn!(subscriber = *entry.key(), "Subscriber lagging, disconnecting");
                        removed.push(*entry.key());
                    }
                },
                Err(mpsc::error::TrySendError::Closed(_)) => removed.push(*entry.key()),
            }
        }

        for id in removed {
            if self.subscribers.remove(&id).is_some() {
                self.counters.disconnected.fetch_add(1, Ordering::Relaxed);
                debug!(subscriber = id, "Subscriber removed");
            }
        }

        self.counters
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            published: self.counters.published.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            saturations: self.counters.saturations.load(Ordering::Relaxed),
            disconnected: self.counters.disconnected.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }

    /// Stored samples of an instrument in `[start, end]`, oldest first.
    pub async fn get_historical_data(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<PriceUpdate>> {
        if start > end {
            return Err(EngineError::invalid(format!(
                "start ({start}) is after end ({end})"
            )));
        }
        let samples = self.prices.range(instrument, start, end).await?;
        Ok(samples.into_iter().map(PriceUpdate::from).collect())
    }
}

/// Receiving side of one subscriber.
///
/// Dropping the subscription unregisters it from the hub.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<PriceUpdate>,
    registry: Arc<Registry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next update, or `None` once the hub removed this subscriber and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<PriceUpdate> {
        self.receiver.recv().await
    }

    /// Next update, or `None` as soon as `cancel` turns true.
    ///
    /// Cancellation is checked before every delivery, so an update already
    /// queued is not handed out after the signal. A dropped sender counts as
    /// cancellation.
    pub async fn recv_until(&mut self, cancel: &mut watch::Receiver<bool>) -> Option<PriceUpdate> {
        if *cancel.borrow() {
            return None;
        }
        tokio::select! {
            biased;
            _ = cancel.wait_for(|cancelled| *cancelled) => None,
            update = self.receiver.recv() => update,
        }
    }

    /// Queued update, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<PriceUpdate> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            debug!(subscriber = self.id, "Subscriber unregistered");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
