//! Mean-reverting (Ornstein–Uhlenbeck) model.
//!
//! Euler–Maruyama discretisation of `dP = κ(θ − P)dt + σ dW`:
//!
//! ```text
//! next = P + κ(θ − P)Δt + σ√Δt · Z,   Z ~ N(0, 1)
//! ```
//!
//! With `σ = 0` the step is deterministic and no randomness is drawn.

use super::{require_finite, PriceProcess};
use crate::error::ModelError;
use crate::model_type::ModelType;
use crate::normal::standard_normal;
use crate::rng::SimulationRng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanRevertingProcess {
    mean: f64,
    kappa: f64,
    sigma: f64,
    dt: f64,
    /// `σ√Δt`, fixed at construction
    diffusion: f64,
}

impl MeanRevertingProcess {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] if `kappa ≤ 0`, `sigma < 0`,
    /// `dt ≤ 0` or any parameter is not finite.
    pub fn new(mean: f64, kappa: f64, sigma: f64, dt: f64) -> Result<Self, ModelError> {
        require_finite("mean", mean)?;
        require_finite("kappa", kappa)?;
        require_finite("sigma", sigma)?;
        require_finite("dt", dt)?;

        if kappa <= 0.0 {
            return Err(ModelError::invalid(format!(
                "kappa must be positive, got {kappa}"
            )));
        }
        if sigma < 0.0 {
            return Err(ModelError::invalid(format!(
                "sigma must be non-negative, got {sigma}"
            )));
        }
        if dt <= 0.0 {
            return Err(ModelError::invalid(format!("dt must be positive, got {dt}")));
        }

        Ok(Self {
            mean,
            kappa,
            sigma,
            dt,
            diffusion: sigma * dt.sqrt(),
        })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl PriceProcess for MeanRevertingProcess {
    #[inline]
    fn generate_next_price(&self, current_price: f64, rng: &mut SimulationRng) -> f64 {
        let drift = self.kappa * (self.mean - current_price) * self.dt;
        if self.sigma == 0.0 {
            return current_price + drift;
        }
        current_price + drift + self.diffusion * standard_normal(rng)
    }

    fn model_type(&self) -> ModelType {
        ModelType::MeanReverting
    }
}
