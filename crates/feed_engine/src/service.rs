//! Price feed service facade.
//!
//! One method per protocol operation, each validating its input and naming
//! the instrument it could not find. Transports (HTTP, WebSocket) only map
//! requests onto these calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use feed_models::{ModelConfig, ModelType, WalkStep};

use crate::error::{EngineError, EngineResult};
use crate::events::{InstrumentConfigurations, PriceUpdate};
use crate::hub::{BroadcastHub, Subscription};
use crate::manager::ModelManager;

/// Entry point for clients of the price feed.
#[derive(Clone)]
pub struct PriceFeedService {
    manager: Arc<ModelManager>,
    hub: Arc<BroadcastHub>,
}

impl PriceFeedService {
    pub fn new(manager: Arc<ModelManager>, hub: Arc<BroadcastHub>) -> Self {
        Self { manager, hub }
    }

    pub fn manager(&self) -> &Arc<ModelManager> {
        &self.manager
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Live updates for the named instruments, or all when empty.
    ///
    /// Names are trimmed and blanks ignored.
    pub fn subscribe_to_prices<I, S>(&self, instruments: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filter: Vec<String> = instruments
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self.hub.subscribe(filter)
    }

    pub async fn get_historical_data(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<PriceUpdate>> {
        self.require_instrument(instrument).await?;
        self.hub.get_historical_data(instrument, start, end).await
    }

    pub fn get_supported_models(&self) -> Vec<ModelType> {
        self.manager.supported_models()
    }

    pub async fn get_configurations(&self, instrument: &str) -> EngineResult<InstrumentConfigurations> {
        self.manager.get_configurations(instrument).await
    }

    /// Returns the previously active model.
    pub async fn switch_model(&self, instrument: &str, model_type: &str) -> EngineResult<ModelType> {
        self.manager.switch_model(instrument, model_type).await
    }

    pub async fn update_tick_interval(&self, instrument: &str, interval_ms: i64) -> EngineResult<u64> {
        self.manager.update_tick_interval(instrument, interval_ms).await
    }

    pub async fn update_random_multiplicative_config(
        &self,
        instrument: &str,
        standard_deviation: f64,
        mean: f64,
    ) -> EngineResult<ModelConfig> {
        self.manager
            .update_random_multiplicative_config(instrument, standard_deviation, mean)
            .await
    }

    pub async fn update_mean_reverting_config(
        &self,
        instrument: &str,
        mean: f64,
        kappa: f64,
        sigma: f64,
        dt: f64,
    ) -> EngineResult<ModelConfig> {
        self.manager
            .update_mean_reverting_config(instrument, mean, kappa, sigma, dt)
            .await
    }

    pub async fn update_random_additive_walk_config(
        &self,
        instrument: &str,
        steps: Vec<WalkStep>,
    ) -> EngineResult<ModelConfig> {
        self.manager
            .update_random_additive_walk_config(instrument, steps)
            .await
    }

    async fn require_instrument(&self, instrument: &str) -> EngineResult<()> {
        match self.manager.try_load_instrument(instrument).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::not_found(instrument)),
        }
    }
}
