//! Store error types.

use thiserror::Error;

/// Errors returned by store backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced instrument does not exist
    #[error("Instrument not found: {0}")]
    NotFound(String),

    /// The backend failed to read or write
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
