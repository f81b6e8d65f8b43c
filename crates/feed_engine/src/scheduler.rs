//! Generation scheduler.
//!
//! Drives the tick loop. The loop wakes every `check_interval_ms` and runs a
//! pass over all tracked instruments:
//!
//! 1. drain configuration changes and hot reload the affected instruments;
//! 2. for every instrument whose tick interval has elapsed, generate the
//!    next price from its simulator;
//! 3. persist the new price when the persistence window has elapsed, and
//!    publish it when the publish window has elapsed.
//!
//! The two throttle windows are tracked per instrument and independently of
//! each other. The effective generation period of an instrument is
//! `max(check_interval_ms, tick_interval_ms)`.
//!
//! Any error inside a pass stops the scheduler. The shutdown signal is the
//! only normal exit.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use feed_models::{ModelType, SimulationRng, Simulator};
use infra_store::{InstrumentRecord, PriceSample, PriceStore};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::events::{ConfigChange, PriceUpdate};
use crate::hub::BroadcastHub;
use crate::manager::ModelManager;

/// Generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wake-up period of the tick loop
    pub check_interval_ms: u64,
    /// Minimum spacing of persisted samples per instrument
    #[serde(alias = "database_persistence_ms")]
    pub persistence_interval_ms: u64,
    /// Minimum spacing of published updates per instrument
    #[serde(alias = "grpc_publish_ms")]
    pub publish_interval_ms: u64,
    /// Fixed seed for reproducible runs
    pub rng_seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 100,
            persistence_interval_ms: 10_000,
            publish_interval_ms: 100,
            rng_seed: None,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("check_interval_ms", self.check_interval_ms),
            ("persistence_interval_ms", self.persistence_interval_ms),
            ("publish_interval_ms", self.publish_interval_ms),
        ] {
            if value == 0 {
                return Err(EngineError::invalid(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

/// Lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Initializing,
    Running,
    Stopping,
    Stopped,
}

/// Counts of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub reloaded: usize,
    pub generated: usize,
    pub persisted: usize,
    pub published: usize,
}

/// Point-in-time view of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentSnapshot {
    pub instrument: String,
    pub model_type: ModelType,
    pub tick_interval_ms: u64,
    pub last_price: f64,
    pub ticks: u64,
    pub persisted: u64,
    pub published: u64,
}

struct InstrumentState {
    record: InstrumentRecord,
    simulator: Simulator,
    last_price: f64,
    last_tick: Option<Instant>,
    last_persist: Option<Instant>,
    last_publish: Option<Instant>,
    ticks: u64,
    persisted: u64,
    published: u64,
}

impl InstrumentState {
    fn new(record: InstrumentRecord, simulator: Simulator, last_price: f64) -> Self {
        Self {
            record,
            simulator,
            last_price,
            last_tick: None,
            last_persist: None,
            last_publish: None,
            ticks: 0,
            persisted: 0,
            published: 0,
        }
    }

    fn snapshot(&self) -> InstrumentSnapshot {
        InstrumentSnapshot {
            instrument: self.record.name.clone(),
            model_type: self.simulator.model_type(),
            tick_interval_ms: self.record.tick_interval_ms,
            last_price: self.last_price,
            ticks: self.ticks,
            persisted: self.persisted,
            published: self.published,
        }
    }
}

/// Never-stamped windows are always due.
fn is_due(last: Option<Instant>, now: Instant, window_ms: u64) -> bool {
    match last {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= Duration::from_millis(window_ms),
    }
}

/// Per-instrument tick scheduler.
pub struct GenerationScheduler {
    config: SchedulerConfig,
    manager: Arc<ModelManager>,
    prices: Arc<dyn PriceStore>,
    hub: Arc<BroadcastHub>,
    instruments: DashMap<String, InstrumentState>,
    rng: Mutex<SimulationRng>,
    changes: Mutex<Option<broadcast::Receiver<ConfigChange>>>,
    state: watch::Sender<SchedulerState>,
}

impl GenerationScheduler {
    pub fn new(
        config: SchedulerConfig,
        manager: Arc<ModelManager>,
        prices: Arc<dyn PriceStore>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        let rng = SimulationRng::from_optional_seed(config.rng_seed);
        let (state, _) = watch::channel(SchedulerState::Initializing);
        Self {
            config,
            manager,
            prices,
            hub,
            instruments: DashMap::new(),
            rng: Mutex::new(rng),
            changes: Mutex::new(None),
            state,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Observes lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: SchedulerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = ?previous, to = ?next, "Scheduler state changed");
        }
    }

    /// Loads every instrument and its seed price, then enters `Running`.
    ///
    /// An instrument without any stored sample has no price to evolve from;
    /// this is a fatal start error.
    pub async fn start(&self) -> EngineResult<()> {
        match self.load_all().await {
            Ok(count) => {
                let seed = self.rng.lock().await.seed();
                info!(instruments = count, ?seed, "Scheduler started");
                self.set_state(SchedulerState::Running);
                Ok(())
            }
            Err(err) => Err(self.stop_fatally(err)),
        }
    }

    async fn load_all(&self) -> EngineResult<usize> {
        self.config.validate()?;
        // Subscribe before loading so no change between the two is lost.
        *self.changes.lock().await = Some(self.manager.subscribe());

        let records = self.manager.load_all().await?;
        for record in records {
            let seed = self.prices.latest(&record.name).await?.ok_or_else(|| {
                EngineError::Fatal(format!("no seed price for instrument '{}'", record.name))
            })?;
            let simulator = self.manager.create_simulator(&record)?;
            info!(
                instrument = %record.name,
                model = %simulator.model_type(),
                price = seed.value,
                "Instrument loaded"
            );
            self.instruments.insert(
                record.name.clone(),
                InstrumentState::new(record, simulator, seed.value),
            );
        }
        Ok(self.instruments.len())
    }

    /// Runs one pass at `now`.
    ///
    /// Fails with [`EngineError::Fatal`] and leaves the scheduler `Stopped`
    /// on any error.
    pub async fn run_pass(&self, now: Instant) -> EngineResult<PassSummary> {
        if self.state() != SchedulerState::Running {
            return Err(EngineError::internal(format!(
                "scheduler is {:?}, not running",
                self.state()
            )));
        }
        match self.pass(now).await {
            Ok(summary) => {
                debug!(
                    reloaded = summary.reloaded,
                    generated = summary.generated,
                    persisted = summary.persisted,
                    published = summary.published,
                    "Pass complete"
                );
                Ok(summary)
            }
            Err(err) => Err(self.stop_fatally(err)),
        }
    }

    async fn pass(&self, now: Instant) -> EngineResult<PassSummary> {
        let mut summary = PassSummary {
            reloaded: self.apply_changes().await?,
            ..PassSummary::default()
        };

        let mut rng = self.rng.lock().await;
        let mut names: Vec<String> = self.instruments.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();

        for name in names {
            let (price, persist, publish) = {
                let Some(mut state) = self.instruments.get_mut(&name) else {
                    continue;
                };
                if !is_due(state.last_tick, now, state.record.tick_interval_ms) {
                    continue;
                }

                let price = state.simulator.generate_next_price(state.last_price, &mut rng);
                if !price.is_finite() {
                    return Err(EngineError::internal(format!(
                        "{} produced a non-finite price for '{name}' from {}",
                        state.simulator.model_type(),
                        state.last_price
                    )));
                }
                state.last_price = price;
                state.last_tick = Some(now);
                state.ticks += 1;

                let persist = is_due(state.last_persist, now, self.config.persistence_interval_ms);
                if persist {
                    state.last_persist = Some(now);
                    state.persisted += 1;
                }
                let publish = is_due(state.last_publish, now, self.config.publish_interval_ms);
                if publish {
                    state.last_publish = Some(now);
                    state.published += 1;
                }
                (price, persist, publish)
            };
            summary.generated += 1;

            let timestamp = Utc::now();
            if persist {
                self.prices
                    .append(PriceSample::new(name.as_str(), price, timestamp))
                    .await?;
                summary.persisted += 1;
            }
            if publish {
                self.hub.publish(PriceUpdate::new(name, price, timestamp));
                summary.published += 1;
            }
        }

        Ok(summary)
    }

    /// Drains pending changes and reloads the affected instruments.
    async fn apply_changes(&self) -> EngineResult<usize> {
        let mut pending = BTreeSet::new();
        let mut reload_all = false;

        {
            let mut guard = self.changes.lock().await;
            let Some(receiver) = guard.as_mut() else {
                return Ok(0);
            };
            loop {
                match receiver.try_recv() {
                    Ok(change) => {
                        pending.insert(change.instrument);
                    }
                    Err(TryRecvError::Lagged(missed)) => {
                        warn!(missed, "Configuration changes lagged, reloading all instruments");
                        reload_all = true;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }

        if reload_all {
            pending.extend(self.instruments.iter().map(|e| e.key().clone()));
            let records = self.manager.load_all().await?;
            pending.extend(records.into_iter().map(|r| r.name));
        }

        for name in &pending {
            self.reload_instrument(name).await?;
        }
        Ok(pending.len())
    }

    /// Swaps the record and simulator of one instrument, keeping its last
    /// price and throttle timestamps.
    async fn reload_instrument(&self, name: &str) -> EngineResult<()> {
        let Some(record) = self.manager.try_load_instrument(name).await? else {
            if self.instruments.remove(name).is_some() {
                info!(instrument = name, "Instrument removed");
            }
            return Ok(());
        };
        let simulator = self.manager.create_simulator(&record)?;
        let model_type = simulator.model_type();

        if let Some(mut state) = self.instruments.get_mut(name) {
            state.record = record;
            state.simulator = simulator;
            info!(instrument = name, model = %model_type, "Instrument reloaded");
            return Ok(());
        }

        match self.prices.latest(name).await? {
            Some(seed) => {
                info!(instrument = name, model = %model_type, price = seed.value, "Instrument added");
                self.instruments.insert(
                    name.to_string(),
                    InstrumentState::new(record, simulator, seed.value),
                );
            }
            None => warn!(instrument = name, "No seed price, instrument not scheduled"),
        }
        Ok(())
    }

    fn stop_fatally(&self, err: EngineError) -> EngineError {
        self.set_state(SchedulerState::Stopped);
        error!(error = %err, "Scheduler stopped");
        match err {
            EngineError::Fatal(_) => err,
            other => EngineError::Fatal(other.to_string()),
        }
    }

    /// Runs the tick loop until `shutdown` resolves or a pass fails.
    ///
    /// Starts the scheduler first if it has not been started.
    pub async fn run<F>(&self, shutdown: F) -> EngineResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        if self.state() == SchedulerState::Initializing {
            self.start().await?;
        }

        let mut ticker = interval(Duration::from_millis(self.config.check_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                now = ticker.tick() => {
                    self.run_pass(now).await?;
                }
            }
        }

        self.set_state(SchedulerState::Stopping);
        self.set_state(SchedulerState::Stopped);
        Ok(())
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    pub fn snapshot(&self, instrument: &str) -> Option<InstrumentSnapshot> {
        self.instruments.get(instrument).map(|state| state.snapshot())
    }

    /// Snapshots of every tracked instrument, ordered by name.
    pub fn snapshots(&self) -> Vec<InstrumentSnapshot> {
        let mut snapshots: Vec<_> = self.instruments.iter().map(|e| e.snapshot()).collect();
        snapshots.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_due() {
        let now = Instant::now();
        assert!(is_due(None, now, 1_000));
        assert!(!is_due(Some(now), now + Duration::from_millis(999), 1_000));
        assert!(is_due(Some(now), now + Duration::from_millis(1_000), 1_000));
    }

    #[test]
    fn test_config_validation() {
        assert!(SchedulerConfig::default().validate().is_ok());
        let config = SchedulerConfig {
            publish_interval_ms: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_config_aliases() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"database_persistence_ms": 5000, "grpc_publish_ms": 250}"#)
                .unwrap();
        assert_eq!(config.persistence_interval_ms, 5_000);
        assert_eq!(config.publish_interval_ms, 250);
        assert_eq!(config.check_interval_ms, 100);
    }
}
