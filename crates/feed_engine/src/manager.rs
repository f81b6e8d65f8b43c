//! Model and configuration manager.
//!
//! Owns validated per-instrument model configuration on top of a
//! [`ConfigStore`]. Every mutation is validated before anything is written
//! and is followed by one [`ConfigChange`] on the change stream, which the
//! generation scheduler drains to hot reload its simulators.
//!
//! Restoring defaults (`ensure_*`) persists the restored values but emits no
//! change: the simulator built from a restored default is the one the
//! scheduler would build anyway.

use std::str::FromStr;
use std::sync::Arc;

use feed_models::{
    MeanRevertingConfig, ModelConfig, ModelType, RandomAdditiveWalkConfig,
    RandomMultiplicativeConfig, RandomWalkSteps, Simulator, WalkStep,
};
use infra_store::{ConfigStore, InstrumentRecord, StoreError};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::events::{ConfigChange, InstrumentConfigurations};

/// Default capacity of the change stream.
pub const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// Manager of instrument model configuration.
pub struct ModelManager {
    store: Arc<dyn ConfigStore>,
    changes: broadcast::Sender<ConfigChange>,
}

impl ModelManager {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self::with_capacity(store, DEFAULT_CHANGE_CAPACITY)
    }

    /// Creates a manager whose change stream buffers `capacity` events per
    /// subscriber. Slower subscribers observe a lag and must resynchronise.
    pub fn with_capacity(store: Arc<dyn ConfigStore>, capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self { store, changes }
    }

    /// Subscribes to configuration changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.changes.subscribe()
    }

    pub fn supported_models(&self) -> Vec<ModelType> {
        ModelType::ALL.to_vec()
    }

    /// Assigns the default model to an instrument that has none.
    ///
    /// Only the active model is written, and only if it is still unset.
    /// Returns the active model type.
    pub async fn ensure_model_type(&self, record: &mut InstrumentRecord) -> EngineResult<ModelType> {
        if let Some(model_type) = record.model_type {
            return Ok(model_type);
        }
        let model_type = self
            .store
            .assign_model_if_unset(&record.name, ModelType::default())
            .await
            .map_err(missing_as_not_found(&record.name))?;
        record.model_type = Some(model_type);
        info!(instrument = %record.name, model = %model_type, "Assigned model");
        Ok(model_type)
    }

    /// Restores the default configuration of the active model if it is
    /// missing. Assigns the default model first when none is set.
    ///
    /// A configuration stored concurrently wins over the default.
    pub async fn ensure_model_configuration(
        &self,
        record: &mut InstrumentRecord,
    ) -> EngineResult<()> {
        let model_type = self.ensure_model_type(record).await?;
        if record.configs.contains_key(&model_type) {
            return Ok(());
        }
        let config = self
            .store
            .insert_config_if_missing(&record.name, &ModelConfig::default_for(model_type))
            .await
            .map_err(missing_as_not_found(&record.name))?;
        record.set_config(config);
        info!(instrument = %record.name, model = %model_type, "Ensured model configuration");
        Ok(())
    }

    /// Loads an instrument with its model type and configuration ensured.
    pub async fn load_instrument(&self, name: &str) -> EngineResult<InstrumentRecord> {
        self.try_load_instrument(name)
            .await?
            .ok_or_else(|| EngineError::not_found(name))
    }

    /// Like [`load_instrument`](Self::load_instrument), but `None` for an
    /// unknown name.
    pub async fn try_load_instrument(&self, name: &str) -> EngineResult<Option<InstrumentRecord>> {
        let Some(mut record) = self.store.get_instrument(name).await? else {
            return Ok(None);
        };
        match self.ensure_model_configuration(&mut record).await {
            Ok(()) => Ok(Some(record)),
            // Deleted after it was read.
            Err(EngineError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Loads every instrument with defaults ensured, ordered by name.
    pub async fn load_all(&self) -> EngineResult<Vec<InstrumentRecord>> {
        let mut records = Vec::new();
        for mut record in self.store.list_instruments().await? {
            match self.ensure_model_configuration(&mut record).await {
                Ok(()) => records.push(record),
                Err(EngineError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }

    /// Switches the active model of an instrument.
    ///
    /// The tag is checked against the supported models before the
    /// instrument is looked up. A configuration for the new model is created
    /// with defaults if none is stored. Returns the previously active model.
    pub async fn switch_model(&self, name: &str, model_type: &str) -> EngineResult<ModelType> {
        let model_type = ModelType::from_str(model_type)?;
        let previous = self
            .store
            .activate_model(name, &ModelConfig::default_for(model_type))
            .await
            .map_err(missing_as_not_found(name))?
            .unwrap_or_default();

        info!(instrument = name, from = %previous, to = %model_type, "Switched model");
        self.notify(name, Some(model_type));
        Ok(previous)
    }

    pub async fn update_random_multiplicative_config(
        &self,
        name: &str,
        standard_deviation: f64,
        mean: f64,
    ) -> EngineResult<ModelConfig> {
        let config = ModelConfig::RandomMultiplicative(RandomMultiplicativeConfig {
            standard_deviation,
            mean,
        });
        self.save_validated(name, config).await
    }

    pub async fn update_mean_reverting_config(
        &self,
        name: &str,
        mean: f64,
        kappa: f64,
        sigma: f64,
        dt: f64,
    ) -> EngineResult<ModelConfig> {
        let config = ModelConfig::MeanReverting(MeanRevertingConfig {
            mean,
            kappa,
            sigma,
            dt,
        });
        self.save_validated(name, config).await
    }

    pub async fn update_random_additive_walk_config(
        &self,
        name: &str,
        steps: Vec<WalkStep>,
    ) -> EngineResult<ModelConfig> {
        let steps = RandomWalkSteps::new(steps)?;
        let config = ModelConfig::RandomAdditiveWalk(RandomAdditiveWalkConfig { steps });
        self.save_validated(name, config).await
    }

    /// Changes how often an instrument ticks. Returns the stored interval.
    pub async fn update_tick_interval(&self, name: &str, interval_ms: i64) -> EngineResult<u64> {
        let interval_ms = u64::try_from(interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                EngineError::invalid(format!(
                    "tick interval must be positive, got {interval_ms} ms"
                ))
            })?;

        self.store
            .set_tick_interval(name, interval_ms)
            .await
            .map_err(missing_as_not_found(name))?;

        info!(instrument = name, interval_ms, "Updated tick interval");
        self.notify(name, None);
        Ok(interval_ms)
    }

    /// Builds the simulator for the active model of a record.
    pub fn create_simulator(&self, record: &InstrumentRecord) -> EngineResult<Simulator> {
        let model_type = record.model_type.ok_or_else(|| {
            EngineError::internal(format!("instrument '{}' has no active model", record.name))
        })?;
        let config = record.configs.get(&model_type).ok_or_else(|| {
            EngineError::internal(format!(
                "instrument '{}' has no configuration for {model_type}",
                record.name
            ))
        })?;
        Simulator::from_config(config).map_err(|e| {
            EngineError::internal(format!(
                "stored {model_type} configuration of '{}' is invalid: {e}",
                record.name
            ))
        })
    }

    pub async fn get_configurations(&self, name: &str) -> EngineResult<InstrumentConfigurations> {
        let record = self.load_instrument(name).await?;
        Ok(InstrumentConfigurations {
            instrument: record.name,
            model_type: record.model_type.unwrap_or_default(),
            tick_interval_ms: record.tick_interval_ms,
            configs: record.configs,
        })
    }

    async fn save_validated(&self, name: &str, config: ModelConfig) -> EngineResult<ModelConfig> {
        config.validate()?;
        self.store
            .save_config(name, &config)
            .await
            .map_err(missing_as_not_found(name))?;

        info!(instrument = name, model = %config.model_type(), "Updated model configuration");
        self.notify(name, None);
        Ok(config)
    }

    fn notify(&self, instrument: &str, model_type: Option<ModelType>) {
        // No receivers is not an error: the scheduler may not be running.
        let receivers = self
            .changes
            .send(ConfigChange::new(instrument, model_type))
            .unwrap_or(0);
        debug!(instrument, receivers, "Configuration change emitted");
    }
}

fn missing_as_not_found(name: &str) -> impl FnOnce(StoreError) -> EngineError + '_ {
    move |err| match err {
        StoreError::NotFound(_) => EngineError::not_found(name),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infra_store::MemoryStore;

    async fn manager_with(records: Vec<InstrumentRecord>) -> (ModelManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for record in &records {
            store.upsert_instrument(record).await.unwrap();
        }
        (ModelManager::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_ensure_defaults_are_persisted() {
        let (manager, store) = manager_with(vec![InstrumentRecord::new("FTSE", 1000)]).await;

        let record = manager.load_instrument("FTSE").await.unwrap();
        assert_eq!(record.model_type, Some(ModelType::RandomMultiplicative));
        assert_eq!(
            record.active_config(),
            Some(&ModelConfig::default_for(ModelType::RandomMultiplicative))
        );

        let stored = store.get_instrument("FTSE").await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_switch_model_returns_previous_and_notifies() {
        let (manager, _) = manager_with(vec![InstrumentRecord::new("FTSE", 1000)]).await;
        let mut changes = manager.subscribe();

        let previous = manager.switch_model("FTSE", "meanreverting").await.unwrap();
        assert_eq!(previous, ModelType::RandomMultiplicative);

        let change = changes.try_recv().unwrap();
        assert_eq!(change.instrument, "FTSE");
        assert_eq!(change.model_type, Some(ModelType::MeanReverting));

        let config = manager.get_configurations("FTSE").await.unwrap();
        assert_eq!(config.model_type, ModelType::MeanReverting);
        assert_eq!(
            config.configs.get(&ModelType::MeanReverting),
            Some(&ModelConfig::default_for(ModelType::MeanReverting))
        );
    }

    #[tokio::test]
    async fn test_switch_model_keeps_existing_config() {
        let record = InstrumentRecord::new("FTSE", 1000).with_model(ModelConfig::Flat);
        let (manager, _) = manager_with(vec![record]).await;

        manager
            .update_mean_reverting_config("FTSE", 50.0, 1.0, 0.0, 0.1)
            .await
            .unwrap();
        manager.switch_model("FTSE", "MeanReverting").await.unwrap();

        let record = manager.load_instrument("FTSE").await.unwrap();
        assert!(matches!(
            record.active_config(),
            Some(ModelConfig::MeanReverting(c)) if c.mean == 50.0
        ));
    }

    #[tokio::test]
    async fn test_switch_model_rejects_unknown_tag_before_lookup() {
        let (manager, _) = manager_with(vec![]).await;
        let err = manager.switch_model("NOPE", "Heston").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let err = manager.switch_model("NOPE", "Flat").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_update_writes_nothing() {
        let (manager, store) = manager_with(vec![InstrumentRecord::new("FTSE", 1000)]).await;
        let mut changes = manager.subscribe();

        let err = manager
            .update_random_multiplicative_config("FTSE", -0.1, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let err = manager
            .update_random_additive_walk_config(
                "FTSE",
                vec![WalkStep::new(0.5, 1.0), WalkStep::new(0.56, -1.0)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        assert!(store.get_instrument("FTSE").await.unwrap().unwrap().configs.is_empty());
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_tick_interval() {
        let (manager, store) = manager_with(vec![InstrumentRecord::new("FTSE", 1000)]).await;
        let mut changes = manager.subscribe();

        assert_eq!(manager.update_tick_interval("FTSE", 250).await.unwrap(), 250);
        assert_eq!(
            store.get_instrument("FTSE").await.unwrap().unwrap().tick_interval_ms,
            250
        );
        assert_eq!(changes.try_recv().unwrap().model_type, None);

        assert!(matches!(
            manager.update_tick_interval("FTSE", 0).await,
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            manager.update_tick_interval("FTSE", -5).await,
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            manager.update_tick_interval("DAX", 100).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_simulator_requires_active_config() {
        let (manager, _) = manager_with(vec![]).await;

        let mut record = InstrumentRecord::new("FTSE", 1000);
        assert!(matches!(
            manager.create_simulator(&record),
            Err(EngineError::Internal(_))
        ));

        record.model_type = Some(ModelType::MeanReverting);
        assert!(matches!(
            manager.create_simulator(&record),
            Err(EngineError::Internal(_))
        ));

        record.set_config(ModelConfig::default_for(ModelType::MeanReverting));
        let simulator = manager.create_simulator(&record).unwrap();
        assert_eq!(simulator.model_type(), ModelType::MeanReverting);
    }

    #[tokio::test]
    async fn test_every_mutation_emits_one_change() {
        let (manager, _) = manager_with(vec![InstrumentRecord::new("FTSE", 1000)]).await;
        let mut changes = manager.subscribe();

        manager.switch_model("FTSE", "Flat").await.unwrap();
        manager
            .update_random_multiplicative_config("FTSE", 0.02, 0.0)
            .await
            .unwrap();
        manager
            .update_mean_reverting_config("FTSE", 100.0, 1.0, 5.0, 0.01)
            .await
            .unwrap();
        manager
            .update_random_additive_walk_config("FTSE", vec![WalkStep::new(1.0, 0.1)])
            .await
            .unwrap();
        manager.update_tick_interval("FTSE", 500).await.unwrap();

        let mut count = 0;
        while changes.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 5);
    }
}
