use super::PriceProcess;
use crate::model_type::ModelType;
use crate::rng::SimulationRng;

/// Constant price: `next = current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlatProcess;

impl PriceProcess for FlatProcess {
    #[inline]
    fn generate_next_price(&self, current_price: f64, _rng: &mut SimulationRng) -> f64 {
        current_price
    }

    fn model_type(&self) -> ModelType {
        ModelType::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_returns_current() {
        let mut rng = SimulationRng::from_seed(1);
        for price in [0.0, 1.0, 99.99, -3.5, 1e9] {
            assert_eq!(FlatProcess.generate_next_price(price, &mut rng), price);
        }
    }
}
