//! In-memory store backend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_models::{ModelConfig, ModelType};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::records::{InstrumentRecord, PriceSample};
use crate::traits::{ConfigStore, PriceStore};

/// Process-local store implementing both [`PriceStore`] and [`ConfigStore`].
///
/// Price samples are kept per instrument in ascending timestamp order.
/// Deleting an instrument removes its configurations but leaves its price
/// history in place.
#[derive(Debug, Default)]
pub struct MemoryStore {
    instruments: RwLock<BTreeMap<String, InstrumentRecord>>,
    prices: RwLock<HashMap<String, Vec<PriceSample>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored samples for an instrument.
    pub async fn sample_count(&self, instrument: &str) -> usize {
        self.prices
            .read()
            .await
            .get(instrument)
            .map_or(0, Vec::len)
    }

    /// Every stored sample for an instrument, oldest first.
    pub async fn samples(&self, instrument: &str) -> Vec<PriceSample> {
        self.prices
            .read()
            .await
            .get(instrument)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn append(&self, sample: PriceSample) -> StoreResult<()> {
        let mut prices = self.prices.write().await;
        let series = prices.entry(sample.instrument.clone()).or_default();
        // Equal timestamps keep insertion order.
        let index = series.partition_point(|s| s.timestamp <= sample.timestamp);
        series.insert(index, sample);
        Ok(())
    }

    async fn latest(&self, instrument: &str) -> StoreResult<Option<PriceSample>> {
        Ok(self
            .prices
            .read()
            .await
            .get(instrument)
            .and_then(|series| series.last().cloned()))
    }

    async fn range(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PriceSample>> {
        if start > end {
            return Ok(Vec::new());
        }
        let prices = self.prices.read().await;
        let Some(series) = prices.get(instrument) else {
            return Ok(Vec::new());
        };
        let from = series.partition_point(|s| s.timestamp < start);
        let to = series.partition_point(|s| s.timestamp <= end);
        Ok(series[from..to].to_vec())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn list_instruments(&self) -> StoreResult<Vec<InstrumentRecord>> {
        Ok(self.instruments.read().await.values().cloned().collect())
    }

    async fn get_instrument(&self, name: &str) -> StoreResult<Option<InstrumentRecord>> {
        Ok(self.instruments.read().await.get(name).cloned())
    }

    async fn upsert_instrument(&self, record: &InstrumentRecord) -> StoreResult<()> {
        self.instruments
            .write()
            .await
            .insert(record.name.clone(), record.clone());
        debug!(instrument = %record.name, "Instrument stored");
        Ok(())
    }

    async fn save_config(&self, instrument: &str, config: &ModelConfig) -> StoreResult<()> {
        let mut instruments = self.instruments.write().await;
        let record = instruments
            .get_mut(instrument)
            .ok_or_else(|| StoreError::NotFound(instrument.to_string()))?;
        record.set_config(config.clone());
        debug!(instrument, model = %config.model_type(), "Model configuration stored");
        Ok(())
    }

    async fn insert_config_if_missing(
        &self,
        instrument: &str,
        config: &ModelConfig,
    ) -> StoreResult<ModelConfig> {
        let mut instruments = self.instruments.write().await;
        let record = instruments
            .get_mut(instrument)
            .ok_or_else(|| StoreError::NotFound(instrument.to_string()))?;
        let stored = record
            .configs
            .entry(config.model_type())
            .or_insert_with(|| {
                debug!(instrument, model = %config.model_type(), "Model configuration stored");
                config.clone()
            });
        Ok(stored.clone())
    }

    async fn assign_model_if_unset(
        &self,
        instrument: &str,
        model_type: ModelType,
    ) -> StoreResult<ModelType> {
        let mut instruments = self.instruments.write().await;
        let record = instruments
            .get_mut(instrument)
            .ok_or_else(|| StoreError::NotFound(instrument.to_string()))?;
        Ok(*record.model_type.get_or_insert(model_type))
    }

    async fn activate_model(
        &self,
        instrument: &str,
        config: &ModelConfig,
    ) -> StoreResult<Option<ModelType>> {
        let mut instruments = self.instruments.write().await;
        let record = instruments
            .get_mut(instrument)
            .ok_or_else(|| StoreError::NotFound(instrument.to_string()))?;
        let model_type = config.model_type();
        record
            .configs
            .entry(model_type)
            .or_insert_with(|| config.clone());
        debug!(instrument, model = %model_type, "Active model stored");
        Ok(record.model_type.replace(model_type))
    }

    async fn set_tick_interval(&self, instrument: &str, tick_interval_ms: u64) -> StoreResult<()> {
        let mut instruments = self.instruments.write().await;
        let record = instruments
            .get_mut(instrument)
            .ok_or_else(|| StoreError::NotFound(instrument.to_string()))?;
        record.tick_interval_ms = tick_interval_ms;
        Ok(())
    }

    async fn delete_instrument(&self, name: &str) -> StoreResult<bool> {
        let removed = self.instruments.write().await.remove(name).is_some();
        if removed {
            debug!(instrument = name, "Instrument deleted");
        }
        Ok(removed)
    }
}
