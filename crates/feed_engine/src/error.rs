//! Engine error types.

use feed_models::ModelError;
use infra_store::StoreError;
use thiserror::Error;

/// Errors raised by the model manager, scheduler and hub.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A request parameter violates its constraint
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced instrument does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An inconsistency the caller cannot fix
    #[error("Internal error: {0}")]
    Internal(String),

    /// The generation loop stopped
    #[error("Fatal scheduler error: {0}")]
    Fatal(String),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse classification used at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(instrument: impl Into<String>) -> Self {
        Self::NotFound(format!("instrument '{}'", instrument.into()))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            EngineError::NotFound(_) | EngineError::Store(StoreError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            EngineError::Internal(_)
            | EngineError::Fatal(_)
            | EngineError::Store(StoreError::Backend(_)) => ErrorKind::Internal,
        }
    }
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidArgument(msg) => EngineError::InvalidArgument(msg),
            ModelError::UnknownModelType(tag) => EngineError::InvalidArgument(format!(
                "unknown model type '{tag}', expected one of {}",
                feed_models::ModelType::supported().join(", ")
            )),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
