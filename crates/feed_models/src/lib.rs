//! # Feed Models
//!
//! Stochastic price models for the synthetic price feed.
//!
//! Each instrument evolves under exactly one active model. A model is
//! described twice in this crate:
//!
//! - as stored configuration ([`ModelConfig`]), a validated tagged union that
//!   the config store persists per instrument and model type;
//! - as a running simulator ([`Simulator`]), an immutable value built from a
//!   configuration that maps the current price plus fresh randomness to the
//!   next price.
//!
//! ## Modules
//!
//! - [`model_type`]: closed enumeration of supported models and its whitelist
//! - [`config`]: per-model parameter sets and their defaults
//! - [`simulators`]: the four price processes and the static dispatch enum
//! - [`normal`]: Box–Muller normal deviates
//! - [`rng`]: seeded random source shared by the simulators
//!
//! ## Example
//!
//! ```
//! use feed_models::prelude::*;
//!
//! let config = ModelConfig::MeanReverting(MeanRevertingConfig {
//!     mean: 100.0,
//!     kappa: 0.5,
//!     sigma: 0.0,
//!     dt: 0.01,
//! });
//! let simulator = Simulator::from_config(&config).unwrap();
//! let mut rng = SimulationRng::from_seed(7);
//!
//! let next = simulator.generate_next_price(110.0, &mut rng);
//! assert!((next - 109.95).abs() < 1e-9);
//! ```

pub mod config;
pub mod error;
pub mod model_type;
pub mod normal;
pub mod rng;
pub mod simulators;

pub use config::{
    MeanRevertingConfig, ModelConfig, RandomAdditiveWalkConfig, RandomMultiplicativeConfig,
    RandomWalkSteps, WalkStep,
};
pub use error::ModelError;
pub use model_type::ModelType;
pub use normal::NormalDistribution;
pub use rng::SimulationRng;
pub use simulators::{PriceProcess, Simulator};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        MeanRevertingConfig, ModelConfig, RandomAdditiveWalkConfig, RandomMultiplicativeConfig,
        RandomWalkSteps, WalkStep,
    };
    pub use crate::error::ModelError;
    pub use crate::model_type::ModelType;
    pub use crate::normal::NormalDistribution;
    pub use crate::rng::SimulationRng;
    pub use crate::simulators::{
        FlatProcess, MeanRevertingProcess, PriceProcess, RandomAdditiveWalkProcess,
        RandomMultiplicativeProcess, Simulator,
    };
}
