//! Per-model parameter sets.
//!
//! [`ModelConfig`] is the stored form of a model: one variant per
//! [`ModelType`], serialised as an internally tagged object
//! (`{"type": "MeanReverting", "mean": 100.0, ...}`).
//!
//! Random-walk step tables are validated on construction and on
//! deserialisation, so an invalid [`RandomWalkSteps`] value cannot exist.
//! Numeric constraints of the other variants are checked by
//! [`ModelConfig::validate`] before a configuration is stored.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model_type::ModelType;
use crate::simulators::Simulator;

/// Tolerance on the sum of random-walk step probabilities.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-4;

/// Trading days per year, used for the default mean-reverting time step.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Parameters of the random multiplicative model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomMultiplicativeConfig {
    /// Standard deviation of the per-tick relative move (> 0)
    pub standard_deviation: f64,
    /// Mean of the per-tick relative move
    pub mean: f64,
}

impl Default for RandomMultiplicativeConfig {
    fn default() -> Self {
        Self {
            standard_deviation: 0.01,
            mean: 0.0,
        }
    }
}

/// Parameters of the mean-reverting (Ornstein–Uhlenbeck) model.
///
/// `kappa` is expressed per year and `sigma` per square-root year, so `dt`
/// is a fraction of a year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanRevertingConfig {
    /// Long-run level
    pub mean: f64,
    /// Speed of reversion (> 0)
    pub kappa: f64,
    /// Volatility (≥ 0)
    pub sigma: f64,
    /// Time step in years (> 0)
    pub dt: f64,
}

impl Default for MeanRevertingConfig {
    fn default() -> Self {
        Self {
            mean: 100.0,
            kappa: 2.0,
            sigma: 10.0,
            dt: 1.0 / TRADING_DAYS_PER_YEAR,
        }
    }
}

/// One outcome of the additive random walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkStep {
    /// Probability of this outcome, in [0, 1]
    pub probability: f64,
    /// Additive price change
    pub delta: f64,
}

impl WalkStep {
    pub fn new(probability: f64, delta: f64) -> Self {
        Self { probability, delta }
    }
}

/// Validated, ordered, non-empty step table.
///
/// # Invariants
///
/// - at least one step
/// - every probability lies in [0, 1]
/// - probabilities sum to 1 within [`PROBABILITY_SUM_TOLERANCE`]
/// - every delta is finite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WalkStep>", into = "Vec<WalkStep>")]
pub struct RandomWalkSteps(Vec<WalkStep>);

impl RandomWalkSteps {
    /// Builds a step table, rejecting any table that violates the invariants.
    ///
    /// # Examples
    ///
    /// ```
    /// use feed_models::{RandomWalkSteps, WalkStep};
    ///
    /// assert!(RandomWalkSteps::new(vec![WalkStep::new(1.0, 0.5)]).is_ok());
    /// assert!(RandomWalkSteps::new(vec![
    ///     WalkStep::new(0.5, 1.0),
    ///     WalkStep::new(0.56, -1.0),
    /// ])
    /// .is_err());
    /// ```
    pub fn new(steps: Vec<WalkStep>) -> Result<Self, ModelError> {
        if steps.is_empty() {
            return Err(ModelError::invalid("random walk requires at least one step"));
        }

        for (index, step) in steps.iter().enumerate() {
            if !step.probability.is_finite() || !(0.0..=1.0).contains(&step.probability) {
                return Err(ModelError::invalid(format!(
                    "step {index}: probability must be in [0, 1], got {}",
                    step.probability
                )));
            }
            if !step.delta.is_finite() {
                return Err(ModelError::invalid(format!(
                    "step {index}: delta must be finite"
                )));
            }
        }

        let total: f64 = steps.iter().map(|s| s.probability).sum();
        if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(ModelError::invalid(format!(
                "step probabilities must sum to 1, got {total}"
            )));
        }

        Ok(Self(steps))
    }

    pub fn steps(&self) -> &[WalkStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Picks the delta for a uniform draw `u ∈ [0, 1)`.
    ///
    /// The first step whose cumulative probability exceeds `u` wins. If
    /// rounding leaves the cumulative sum at or below `u`, the last step is
    /// used.
    pub fn select(&self, u: f64) -> f64 {
        let mut cumulative = 0.0;
        for step in &self.0 {
            cumulative += step.probability;
            if u < cumulative {
                return step.delta;
            }
        }
        // Non-empty by construction.
        self.0.last().map_or(0.0, |s| s.delta)
    }
}

impl TryFrom<Vec<WalkStep>> for RandomWalkSteps {
    type Error = ModelError;

    fn try_from(steps: Vec<WalkStep>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<RandomWalkSteps> for Vec<WalkStep> {
    fn from(steps: RandomWalkSteps) -> Self {
        steps.0
    }
}

impl Default for RandomWalkSteps {
    fn default() -> Self {
        Self(vec![
            WalkStep::new(0.25, -0.02),
            WalkStep::new(0.25, -0.01),
            WalkStep::new(0.25, 0.01),
            WalkStep::new(0.25, 0.02),
        ])
    }
}

/// Parameters of the additive random walk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RandomAdditiveWalkConfig {
    pub steps: RandomWalkSteps,
}

/// Stored configuration of a model, one variant per [`ModelType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelConfig {
    RandomMultiplicative(RandomMultiplicativeConfig),
    MeanReverting(MeanRevertingConfig),
    Flat,
    RandomAdditiveWalk(RandomAdditiveWalkConfig),
}

impl ModelConfig {
    /// Documented default parameters for a model type.
    ///
    /// # Examples
    ///
    /// ```
    /// use feed_models::{ModelConfig, ModelType};
    ///
    /// let config = ModelConfig::default_for(ModelType::MeanReverting);
    /// assert_eq!(config.model_type(), ModelType::MeanReverting);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn default_for(model_type: ModelType) -> Self {
        match model_type {
            ModelType::RandomMultiplicative => {
                ModelConfig::RandomMultiplicative(RandomMultiplicativeConfig::default())
            }
            ModelType::MeanReverting => ModelConfig::MeanReverting(MeanRevertingConfig::default()),
            ModelType::Flat => ModelConfig::Flat,
            ModelType::RandomAdditiveWalk => {
                ModelConfig::RandomAdditiveWalk(RandomAdditiveWalkConfig::default())
            }
        }
    }

    /// Tag of the model this configuration belongs to.
    pub fn model_type(&self) -> ModelType {
        match self {
            ModelConfig::RandomMultiplicative(_) => ModelType::RandomMultiplicative,
            ModelConfig::MeanReverting(_) => ModelType::MeanReverting,
            ModelConfig::Flat => ModelType::Flat,
            ModelConfig::RandomAdditiveWalk(_) => ModelType::RandomAdditiveWalk,
        }
    }

    /// Checks every parameter constraint of the variant.
    ///
    /// A configuration that validates is guaranteed to build a simulator.
    pub fn validate(&self) -> Result<(), ModelError> {
        Simulator::from_config(self).map(|_| ())
    }
}
