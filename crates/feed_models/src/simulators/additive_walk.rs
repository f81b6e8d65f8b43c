use super::PriceProcess;
use crate::config::RandomWalkSteps;
use crate::model_type::ModelType;
use crate::rng::SimulationRng;

/// Additive random walk over a discrete step table.
///
/// Each tick draws `u ~ U(0, 1)` and adds the delta of the step selected by
/// [`RandomWalkSteps::select`]. The table is validated when it is built, so
/// construction cannot fail here.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomAdditiveWalkProcess {
    steps: RandomWalkSteps,
}

impl RandomAdditiveWalkProcess {
    pub fn new(steps: RandomWalkSteps) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &RandomWalkSteps {
        &self.steps
    }
}

impl PriceProcess for RandomAdditiveWalkProcess {
    #[inline]
    fn generate_next_price(&self, current_price: f64, rng: &mut SimulationRng) -> f64 {
        current_price + self.steps.select(rng.gen_uniform())
    }

    fn model_type(&self) -> ModelType {
        ModelType::RandomAdditiveWalk
    }
}
