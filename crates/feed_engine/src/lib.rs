//! # Feed Engine
//!
//! Generation, configuration and distribution of synthetic prices.
//!
//! - [`manager`]: validated per-instrument model configuration and the
//!   change stream
//! - [`scheduler`]: the tick loop with per-instrument due checks and
//!   independent persistence/publish throttles
//! - [`hub`]: fan-out of live updates to filtered, bounded subscriber queues
//! - [`service`]: one method per client-facing operation
//!
//! ## Wiring
//!
//! ```no_run
//! use std::sync::Arc;
//! use feed_engine::prelude::*;
//! use infra_store::MemoryStore;
//!
//! # async fn wire() -> Result<(), EngineError> {
//! let store = Arc::new(MemoryStore::new());
//! let manager = Arc::new(ModelManager::new(store.clone()));
//! let hub = Arc::new(BroadcastHub::new(HubConfig::default(), store.clone()));
//! let scheduler = Arc::new(GenerationScheduler::new(
//!     SchedulerConfig::default(),
//!     manager.clone(),
//!     store,
//!     hub.clone(),
//! ));
//! let service = PriceFeedService::new(manager, hub);
//!
//! let mut prices = service.subscribe_to_prices(["FTSE"]);
//! tokio::spawn(async move { scheduler.run(std::future::pending()).await });
//! let _first = prices.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod hub;
pub mod manager;
pub mod scheduler;
pub mod service;

pub use error::{EngineError, EngineResult, ErrorKind};
pub use events::{ConfigChange, InstrumentConfigurations, PriceUpdate};
pub use hub::{BroadcastHub, DropPolicy, HubConfig, HubStats, Subscription};
pub use manager::ModelManager;
pub use scheduler::{
    GenerationScheduler, InstrumentSnapshot, PassSummary, SchedulerConfig, SchedulerState,
};
pub use service::PriceFeedService;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{EngineError, EngineResult, ErrorKind};
    pub use crate::events::{ConfigChange, InstrumentConfigurations, PriceUpdate};
    pub use crate::hub::{BroadcastHub, DropPolicy, HubConfig, HubStats, Subscription};
    pub use crate::manager::ModelManager;
    pub use crate::scheduler::{
        GenerationScheduler, InstrumentSnapshot, PassSummary, SchedulerConfig, SchedulerState,
    };
    pub use crate::service::PriceFeedService;
}
