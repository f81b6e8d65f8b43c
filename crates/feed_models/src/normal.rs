//! Gaussian deviates via the Box–Muller transform.
//!
//! Given independent `u1 ∈ (0, 1]` and `u2 ∈ [0, 1)`:
//!
//! ```text
//! z = √(−2 ln u1) · cos(2π u2)
//! ```
//!
//! is a standard normal deviate. Only the cosine branch is used; the sine
//! branch is discarded so every call consumes exactly two uniforms.

use std::f64::consts::TAU;

use crate::error::ModelError;
use crate::rng::SimulationRng;

/// Normal-distribution generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalDistribution;

impl NormalDistribution {
    /// Draws from `N(mean, standard_deviation²)`.
    ///
    /// A zero standard deviation returns `mean` exactly and consumes no
    /// randomness.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] if `standard_deviation` is
    /// negative or either argument is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use feed_models::{NormalDistribution, SimulationRng};
    ///
    /// let mut rng = SimulationRng::from_seed(1);
    /// assert_eq!(NormalDistribution::generate(5.0, 0.0, &mut rng).unwrap(), 5.0);
    /// assert!(NormalDistribution::generate(0.0, -1.0, &mut rng).is_err());
    /// ```
    pub fn generate(
        mean: f64,
        standard_deviation: f64,
        rng: &mut SimulationRng,
    ) -> Result<f64, ModelError> {
        if !mean.is_finite() || !standard_deviation.is_finite() {
            return Err(ModelError::invalid(
                "mean and standard deviation must be finite",
            ));
        }
        if standard_deviation < 0.0 {
            return Err(ModelError::invalid(format!(
                "standard deviation must be non-negative, got {standard_deviation}"
            )));
        }
        if standard_deviation == 0.0 {
            return Ok(mean);
        }
        Ok(mean + standard_deviation * standard_normal(rng))
    }
}

/// Standard normal deviate. Always finite.
#[inline]
pub(crate) fn standard_normal(rng: &mut SimulationRng) -> f64 {
    let u1 = rng.gen_open_uniform();
    let u2 = rng.gen_uniform();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
