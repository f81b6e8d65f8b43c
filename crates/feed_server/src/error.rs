//! Error types for the HTTP surface and server lifecycle.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use feed_engine::{EngineError, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler error mapped onto an HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Engine(err) => err.kind(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "Request failed");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };
        let body = ErrorResponse {
            error: kind.as_str().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Server lifecycle errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid socket address: {0}")]
    InvalidAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Scheduler task failed: {0}")]
    Task(String),
}
