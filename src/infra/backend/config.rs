//! Backend connection configuration.

use std::env;
use std::time::Duration;

use tracing::warn;
use validator::Validate;

use crate::domain::{AppError, ConfigError};
use crate::resilience::RetryPreset;

/// Used when neither backend URL variable is set
pub const FALLBACK_BACKEND_URL: &str = "http://localhost:5000/api/v1";

/// Versioned API prefix every backend base URL ends with
pub const API_PREFIX: &str = "/api/v1";

/// Resolve the backend base URL.
///
/// Order: the server-side URL as given, then the public URL normalized to
/// end in `/api/v1`, then [`FALLBACK_BACKEND_URL`]. Blank values are skipped.
pub fn resolve_backend_base_url(server_url: Option<&str>, public_url: Option<&str>) -> String {
    if let Some(url) = non_blank(server_url) {
        return url.trim_end_matches('/').to_string();
    }

    if let Some(url) = non_blank(public_url) {
        let url = url.trim_end_matches('/');
        if url.ends_with(API_PREFIX) {
            return url.to_string();
        }
        if let Some(root) = url.strip_suffix("/api") {
            return format!("{}{}", root, API_PREFIX);
        }
        return format!("{}{}", url, API_PREFIX);
    }

    FALLBACK_BACKEND_URL.to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a millisecond setting; unset or blank keeps `default`
fn parse_millis(name: &str, value: Option<&str>, default: u64) -> Result<u64, AppError> {
    match non_blank(value) {
        Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
            AppError::Config(ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{}' is not a whole number of milliseconds: {}", raw, e),
            })
        }),
        None => Ok(default),
    }
}

/// Configuration for [`HttpBackendClient`](super::HttpBackendClient) and the proxy service
#[derive(Debug, Clone, Validate)]
pub struct BackendConfig {
    /// Resolved backend base URL
    #[validate(url(message = "Backend URL must be an absolute URL"))]
    pub base_url: String,
    /// Timeout for a single upstream call
    #[validate(range(min = 1, max = 300_000, message = "Upstream timeout must be 1ms-300s"))]
    pub upstream_timeout_ms: u64,
    /// Budget for a whole proxied request, including retries and fallbacks
    #[validate(range(min = 1, max = 600_000, message = "Request deadline must be 1ms-600s"))]
    pub request_deadline_ms: u64,
    /// Retry preset applied to idempotent requests
    pub retry_preset: RetryPreset,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: FALLBACK_BACKEND_URL.to_string(),
            upstream_timeout_ms: 15_000,
            request_deadline_ms: 30_000,
            retry_preset: RetryPreset::Quick,
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        let server_url = env::var("BACKEND_API_URL").ok();
        let public_url = env::var("PUBLIC_API_URL").ok();
        let base_url = resolve_backend_base_url(server_url.as_deref(), public_url.as_deref());

        let defaults = Self::default();

        let upstream_timeout_ms = parse_millis(
            "UPSTREAM_TIMEOUT_MS",
            env::var("UPSTREAM_TIMEOUT_MS").ok().as_deref(),
            defaults.upstream_timeout_ms,
        )?;
        let request_deadline_ms = parse_millis(
            "REQUEST_DEADLINE_MS",
            env::var("REQUEST_DEADLINE_MS").ok().as_deref(),
            defaults.request_deadline_ms,
        )?;

        let retry_preset = match env::var("RETRY_PRESET") {
            Ok(value) if !value.trim().is_empty() => {
                value.parse().map_err(|message: String| {
                    AppError::Config(ConfigError::InvalidValue {
                        name: "RETRY_PRESET".to_string(),
                        message,
                    })
                })?
            }
            _ => defaults.retry_preset,
        };

        let config = Self {
            base_url,
            upstream_timeout_ms,
            request_deadline_ms,
            retry_preset,
        };
        config.validate_settings()?;
        Ok(config)
    }

    /// Field validation plus cross-field checks
    pub fn validate_settings(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Config(ConfigError::Invalid(e.to_string())))?;

        if self.request_deadline_ms < self.upstream_timeout_ms {
            warn!(
                deadline_ms = self.request_deadline_ms,
                upstream_timeout_ms = self.upstream_timeout_ms,
                "Request deadline is shorter than the upstream timeout"
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout_ms = (timeout.as_millis() as u64).max(1);
        self
    }

    #[must_use]
    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline_ms = (deadline.as_millis() as u64).max(1);
        self
    }

    #[must_use]
    pub fn with_retry_preset(mut self, preset: RetryPreset) -> Self {
        self.retry_preset = preset;
        self
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}
