//! Records exchanged between the engine components and subscribers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use feed_models::{ModelConfig, ModelType};
use infra_store::PriceSample;
use serde::{Deserialize, Serialize};

/// Live price update pushed to subscribers.
///
/// `timestamp_ms` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub instrument: String,
    pub value: f64,
    pub timestamp_ms: i64,
}

impl PriceUpdate {
    pub fn new(instrument: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            instrument: instrument.into(),
            value,
            timestamp_ms: timestamp.timestamp_millis(),
        }
    }

    /// Timestamp as a UTC date-time, `None` if out of range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

impl From<PriceSample> for PriceUpdate {
    fn from(sample: PriceSample) -> Self {
        PriceUpdate::new(sample.instrument, sample.value, sample.timestamp)
    }
}

/// Notification emitted for every configuration mutation.
///
/// `model_type` is set when the active model was switched and empty for
/// parameter or tick-interval updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChange {
    pub instrument: String,
    pub model_type: Option<ModelType>,
    pub timestamp: DateTime<Utc>,
}

impl ConfigChange {
    pub fn new(instrument: impl Into<String>, model_type: Option<ModelType>) -> Self {
        Self {
            instrument: instrument.into(),
            model_type,
            timestamp: Utc::now(),
        }
    }
}

/// Current configuration of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentConfigurations {
    pub instrument: String,
    pub model_type: ModelType,
    pub tick_interval_ms: u64,
    pub configs: BTreeMap<ModelType, ModelConfig>,
}
