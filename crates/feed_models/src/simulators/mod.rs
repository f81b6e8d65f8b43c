//! Price simulators.
//!
//! Each simulator is an immutable value that maps the current price plus
//! fresh randomness to the next price. Simulators perform no I/O and always
//! return a finite number; the result is not guaranteed to be positive.
//!
//! ## Dispatch
//!
//! [`Simulator`] is a closed enum with one variant per [`ModelType`]. The
//! scheduler holds a `Simulator` per instrument and calls
//! [`Simulator::generate_next_price`], which resolves with a `match`.
//! Each concrete process also implements [`PriceProcess`] so it can be used
//! on its own.
//!
//! ## Example
//!
//! ```
//! use feed_models::prelude::*;
//!
//! let simulator = Simulator::from_config(&ModelConfig::Flat).unwrap();
//! let mut rng = SimulationRng::from_seed(0);
//!
//! assert_eq!(simulator.model_type(), ModelType::Flat);
//! assert_eq!(simulator.generate_next_price(101.5, &mut rng), 101.5);
//! ```

mod additive_walk;
mod flat;
mod mean_reverting;
mod multiplicative;

pub use additive_walk::RandomAdditiveWalkProcess;
pub use flat::FlatProcess;
pub use mean_reverting::MeanRevertingProcess;
pub use multiplicative::RandomMultiplicativeProcess;

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::model_type::ModelType;
use crate::rng::SimulationRng;

/// One-step price evolution.
pub trait PriceProcess {
    /// Produces the next price from the current one.
    fn generate_next_price(&self, current_price: f64, rng: &mut SimulationRng) -> f64;

    /// Tag of the model implemented by this process.
    fn model_type(&self) -> ModelType;
}

/// Static dispatch over the supported price processes.
#[derive(Debug, Clone, PartialEq)]
pub enum Simulator {
    RandomMultiplicative(RandomMultiplicativeProcess),
    MeanReverting(MeanRevertingProcess),
    Flat(FlatProcess),
    RandomAdditiveWalk(RandomAdditiveWalkProcess),
}

impl Simulator {
    /// Builds the simulator described by a stored configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] if a parameter violates its
    /// constraint.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        Ok(match config {
            ModelConfig::RandomMultiplicative(c) => Simulator::RandomMultiplicative(
                RandomMultiplicativeProcess::new(c.standard_deviation, c.mean)?,
            ),
            ModelConfig::MeanReverting(c) => Simulator::MeanReverting(MeanRevertingProcess::new(
                c.mean, c.kappa, c.sigma, c.dt,
            )?),
            ModelConfig::Flat => Simulator::Flat(FlatProcess),
            ModelConfig::RandomAdditiveWalk(c) => {
                Simulator::RandomAdditiveWalk(RandomAdditiveWalkProcess::new(c.steps.clone()))
            }
        })
    }

    #[inline]
    pub fn generate_next_price(&self, current_price: f64, rng: &mut SimulationRng) -> f64 {
        match self {
            Simulator::RandomMultiplicative(p) => p.generate_next_price(current_price, rng),
            Simulator::MeanReverting(p) => p.generate_next_price(current_price, rng),
            Simulator::Flat(p) => p.generate_next_price(current_price, rng),
            Simulator::RandomAdditiveWalk(p) => p.generate_next_price(current_price, rng),
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            Simulator::RandomMultiplicative(_) => ModelType::RandomMultiplicative,
            Simulator::MeanReverting(_) => ModelType::MeanReverting,
            Simulator::Flat(_) => ModelType::Flat,
            Simulator::RandomAdditiveWalk(_) => ModelType::RandomAdditiveWalk,
        }
    }
}

impl PriceProcess for Simulator {
    fn generate_next_price(&self, current_price: f64, rng: &mut SimulationRng) -> f64 {
        Simulator::generate_next_price(self, current_price, rng)
    }

    fn model_type(&self) -> ModelType {
        Simulator::model_type(self)
    }
}

pub(crate) fn require_finite(name: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::invalid(format!("{name} must be finite, got {value}")))
    }
}
