//! Domain traits defining contracts for external systems.

use async_trait::async_trait;

use super::error::AppError;
use super::types::{ForwardRequest, UpstreamResponse};

/// Client for the marketplace backend API
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Check backend connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Send `request` to `path` (relative to the backend base URL).
    ///
    /// Any HTTP status is a successful call; only transport failures are errors.
    async fn send(&self, request: &ForwardRequest, path: &str) -> Result<UpstreamResponse, AppError>;
}
