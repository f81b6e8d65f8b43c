//! Error types for model construction and validation.

use thiserror::Error;

/// Errors raised while validating model parameters.
///
/// Every variant is an invalid-argument condition: it is detected before any
/// configuration is stored or any simulator is built.
///
/// # Examples
/// ```
/// use feed_models::ModelError;
///
/// let err = ModelError::UnknownModelType("Heston".to_string());
/// assert_eq!(err.to_string(), "Unknown model type: Heston");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A numeric parameter violates its constraint
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A model tag outside the supported whitelist
    #[error("Unknown model type: {0}")]
    UnknownModelType(String),
}

impl ModelError {
    /// Create an invalid argument error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
