//! Stored record types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use feed_models::{ModelConfig, ModelType};
use serde::{Deserialize, Serialize};

/// Instrument definition as held by the config store.
///
/// `configs` keeps at most one configuration per model type. The entry for
/// the active `model_type` may be missing; the model manager restores it
/// with defaults before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub name: String,
    pub tick_interval_ms: u64,
    pub model_type: Option<ModelType>,
    #[serde(default)]
    pub configs: BTreeMap<ModelType, ModelConfig>,
}

impl InstrumentRecord {
    pub fn new(name: impl Into<String>, tick_interval_ms: u64) -> Self {
        Self {
            name: name.into(),
            tick_interval_ms,
            model_type: None,
            configs: BTreeMap::new(),
        }
    }

    /// Sets the active model and stores its configuration.
    pub fn with_model(mut self, config: ModelConfig) -> Self {
        let model_type = config.model_type();
        self.model_type = Some(model_type);
        self.configs.insert(model_type, config);
        self
    }

    /// Configuration of the active model, if both are present.
    pub fn active_config(&self) -> Option<&ModelConfig> {
        self.model_type.and_then(|t| self.configs.get(&t))
    }

    /// Stores `config` under its own model type, replacing any previous one.
    pub fn set_config(&mut self, config: ModelConfig) {
        self.configs.insert(config.model_type(), config);
    }
}

/// One generated price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub instrument: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceSample {
    pub fn new(instrument: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            instrument: instrument.into(),
            value,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_models::RandomMultiplicativeConfig;

    #[test]
    fn test_active_config() {
        let record = InstrumentRecord::new("FTSE", 1000);
        assert!(record.active_config().is_none());

        let record = record.with_model(ModelConfig::Flat);
        assert_eq!(record.model_type, Some(ModelType::Flat));
        assert_eq!(record.active_config(), Some(&ModelConfig::Flat));
    }

    #[test]
    fn test_set_config_keeps_one_per_type() {
        let mut record = InstrumentRecord::new("DAX", 500);
        record.set_config(ModelConfig::default_for(ModelType::RandomMultiplicative));
        record.set_config(ModelConfig::RandomMultiplicative(RandomMultiplicativeConfig {
            standard_deviation: 0.05,
            mean: 0.0,
        }));
        record.set_config(ModelConfig::Flat);

        assert_eq!(record.configs.len(), 2);
        assert!(matches!(
            record.configs.get(&ModelType::RandomMultiplicative),
            Some(ModelConfig::RandomMultiplicative(c)) if c.standard_deviation == 0.05
        ));
    }

    #[test]
    fn test_record_serialises_configs_by_type() {
        let record = InstrumentRecord::new("FTSE", 1000).with_model(ModelConfig::Flat);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["model_type"], "Flat");
        assert_eq!(json["configs"]["Flat"]["type"], "Flat");
    }
}
