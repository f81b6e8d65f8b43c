//! Closed enumeration of the supported price models.
//!
//! The model tag is the only place where a model is named by string (wire
//! requests and stored records). Parsing goes through [`ModelType::from_str`],
//! which is the whitelist: anything outside [`ModelType::ALL`] is rejected.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ModelError;

/// Model tag identifying which simulator drives an instrument.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ModelType {
    /// Geometric noise: `next = price * (1 + X)`, `X ~ N(mean, sd)`
    #[default]
    RandomMultiplicative,
    /// Discretised Ornstein–Uhlenbeck process
    MeanReverting,
    /// Constant price
    Flat,
    /// Discrete additive steps drawn from a probability table
    RandomAdditiveWalk,
}

impl ModelType {
    /// Every supported model, in presentation order.
    pub const ALL: [ModelType; 4] = [
        ModelType::RandomMultiplicative,
        ModelType::MeanReverting,
        ModelType::Flat,
        ModelType::RandomAdditiveWalk,
    ];

    /// Canonical wire name of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::RandomMultiplicative => "RandomMultiplicative",
            ModelType::MeanReverting => "MeanReverting",
            ModelType::Flat => "Flat",
            ModelType::RandomAdditiveWalk => "RandomAdditiveWalk",
        }
    }

    /// Canonical names of all supported models.
    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(ModelType::as_str).collect()
    }
}

impl FromStr for ModelType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ModelError::UnknownModelType(s.to_string()))
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_canonical_names() {
        for model in ModelType::ALL {
            assert_eq!(ModelType::from_str(model.as_str()).unwrap(), model);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ModelType::from_str("flat").unwrap(), ModelType::Flat);
        assert_eq!(
            ModelType::from_str(" meanreverting ").unwrap(),
            ModelType::MeanReverting
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = ModelType::from_str("Heston").unwrap_err();
        assert_eq!(err, ModelError::UnknownModelType("Heston".to_string()));
        assert!(ModelType::from_str("").is_err());
    }

    #[test]
    fn test_supported_lists_every_model() {
        let names = ModelType::supported();
        assert_eq!(
            names,
            vec!["RandomMultiplicative", "MeanReverting", "Flat", "RandomAdditiveWalk"]
        );
    }

    #[test]
    fn test_default_is_multiplicative() {
        assert_eq!(ModelType::default(), ModelType::RandomMultiplicative);
    }
}
