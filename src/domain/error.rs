//! Application error types.

use thiserror::Error;

use crate::resilience::TimeoutError;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Authentication(String),

    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Whether another attempt at the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::ExternalService(
                ExternalServiceError::Network(_) | ExternalServiceError::Timeout(_)
            )
        )
    }
}

/// Errors talking to the marketplace backend
#[derive(Debug, Error)]
pub enum ExternalServiceError {
    #[error("{0}")]
    Unavailable(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl From<TimeoutError> for ExternalServiceError {
    fn from(err: TimeoutError) -> Self {
        ExternalServiceError::Timeout(err.duration.as_millis() as u64)
    }
}

impl From<TimeoutError> for AppError {
    fn from(err: TimeoutError) -> Self {
        AppError::ExternalService(err.into())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
