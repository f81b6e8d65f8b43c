//! Random multiplicative model.
//!
//! `next = current × (1 + X)` with `X ~ N(mean, standard_deviation²)`.
//!
//! Because the noise is applied to the price and not its logarithm, the
//! expected log-return per step is approximately `mean − sd²/2`. The drift
//! is left uncorrected.

use super::{require_finite, PriceProcess};
use crate::error::ModelError;
use crate::model_type::ModelType;
use crate::normal::standard_normal;
use crate::rng::SimulationRng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomMultiplicativeProcess {
    standard_deviation: f64,
    mean: f64,
}

impl RandomMultiplicativeProcess {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArgument`] if `standard_deviation ≤ 0`
    /// or either parameter is not finite.
    pub fn new(standard_deviation: f64, mean: f64) -> Result<Self, ModelError> {
        require_finite("standard_deviation", standard_deviation)?;
        require_finite("mean", mean)?;
        if standard_deviation <= 0.0 {
            return Err(ModelError::invalid(format!(
                "standard_deviation must be positive, got {standard_deviation}"
            )));
        }
        Ok(Self {
            standard_deviation,
            mean,
        })
    }

    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
}

impl PriceProcess for RandomMultiplicativeProcess {
    #[inline]
    fn generate_next_price(&self, current_price: f64, rng: &mut SimulationRng) -> f64 {
        let x = self.mean + self.standard_deviation * standard_normal(rng);
        current_price * (1.0 + x)
    }

    fn model_type(&self) -> ModelType {
        ModelType::RandomMultiplicative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_non_positive_sd() {
        assert!(RandomMultiplicativeProcess::new(0.0, 0.0).is_err());
        assert!(RandomMultiplicativeProcess::new(-0.01, 0.0).is_err());
        assert!(RandomMultiplicativeProcess::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_accessors() {
        let process = RandomMultiplicativeProcess::new(0.02, 0.001).unwrap();
        assert_eq!(process.standard_deviation(), 0.02);
        assert_eq!(process.mean(), 0.001);
        assert_eq!(process.model_type(), ModelType::RandomMultiplicative);
    }

    #[test]
    fn test_relative_move_statistics() {
        let process = RandomMultiplicativeProcess::new(0.01, 0.002).unwrap();
        let mut rng = SimulationRng::from_seed(77);
        let n = 50_000;

        let moves: Vec<f64> = (0..n)
            .map(|_| process.generate_next_price(100.0, &mut rng) / 100.0 - 1.0)
            .collect();
        let mean = moves.iter().sum::<f64>() / n as f64;
        let sd = (moves.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt();

        assert_relative_eq!(mean, 0.002, epsilon = 3e-4);
        assert_relative_eq!(sd, 0.01, epsilon = 3e-4);
    }

    #[test]
    fn test_zero_mean_paths_decay_at_log_drift() {
        let sd = 0.05;
        let process = RandomMultiplicativeProcess::new(sd, 0.0).unwrap();
        let mut rng = SimulationRng::from_seed(2024);
        let (paths, steps) = (1_000, 1_000);

        let mut log_return_sum = 0.0;
        let mut terminal: Vec<f64> = (0..paths)
            .map(|_| {
                let mut price = 100.0;
                for _ in 0..steps {
                    let next = process.generate_next_price(price, &mut rng);
                    log_return_sum += (next / price).ln();
                    price = next;
                }
                price
            })
            .collect();

        let mean_log_return = log_return_sum / (paths * steps) as f64;
        assert_relative_eq!(mean_log_return, -sd * sd / 2.0, epsilon = 2.5e-4);

        terminal.sort_by(f64::total_cmp);
        let median = terminal[paths / 2];
        assert!(median < 100.0, "median terminal price {median}");
    }

    #[test]
    fn test_zero_price_stays_zero() {
        let process = RandomMultiplicativeProcess::new(0.05, 0.0).unwrap();
        let mut rng = SimulationRng::from_seed(1);
        assert_eq!(process.generate_next_price(0.0, &mut rng), 0.0);
    }
}
