//! Store interfaces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_models::{ModelConfig, ModelType};

use crate::error::StoreResult;
use crate::records::{InstrumentRecord, PriceSample};

/// Append-only price history.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Records one sample.
    async fn append(&self, sample: PriceSample) -> StoreResult<()>;

    /// Most recent sample of an instrument, by timestamp.
    async fn latest(&self, instrument: &str) -> StoreResult<Option<PriceSample>>;

    /// Samples with `start ≤ timestamp ≤ end`, in ascending timestamp order.
    async fn range(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PriceSample>>;
}

/// Instrument definitions and their model configurations.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// All instruments, ordered by name.
    async fn list_instruments(&self) -> StoreResult<Vec<InstrumentRecord>>;

    async fn get_instrument(&self, name: &str) -> StoreResult<Option<InstrumentRecord>>;

    /// Creates or replaces an instrument together with its configurations.
    async fn upsert_instrument(&self, record: &InstrumentRecord) -> StoreResult<()>;

    /// Creates or replaces the configuration for the config's model type.
    ///
    /// Fails with `NotFound` if the instrument does not exist.
    async fn save_config(&self, instrument: &str, config: &ModelConfig) -> StoreResult<()>;

    /// Stores `config` only if no configuration exists for its model type.
    ///
    /// Returns the configuration stored for that type afterwards. Fails with
    /// `NotFound` if the instrument does not exist.
    async fn insert_config_if_missing(
        &self,
        instrument: &str,
        config: &ModelConfig,
    ) -> StoreResult<ModelConfig>;

    /// Sets the active model only if none is set.
    ///
    /// Returns the active model afterwards. Fails with `NotFound` if the
    /// instrument does not exist.
    async fn assign_model_if_unset(
        &self,
        instrument: &str,
        model_type: ModelType,
    ) -> StoreResult<ModelType>;

    /// Makes the model of `config` active, storing `config` unless a
    /// configuration for that model already exists.
    ///
    /// Returns the previously active model. Fails with `NotFound` if the
    /// instrument does not exist.
    async fn activate_model(
        &self,
        instrument: &str,
        config: &ModelConfig,
    ) -> StoreResult<Option<ModelType>>;

    /// Fails with `NotFound` if the instrument does not exist.
    async fn set_tick_interval(&self, instrument: &str, tick_interval_ms: u64) -> StoreResult<()>;

    /// Removes an instrument and all of its configurations.
    ///
    /// Returns whether the instrument existed.
    async fn delete_instrument(&self, name: &str) -> StoreResult<bool>;
}
