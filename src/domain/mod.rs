//! Domain layer containing core types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{AppError, ConfigError, ExternalServiceError};
pub use traits::BackendClient;
pub use types::{
    ApiErrorResponse, ForwardRequest, HealthResponse, HealthStatus, ProxyTarget, UpstreamResponse,
};
