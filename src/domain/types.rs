//! Domain types for proxied requests and API responses.

use axum::body::Bytes;
use axum::http::Method;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

/// Inbound request as forwarded to the backend
#[derive(Debug)]
pub struct ForwardRequest {
    pub method: Method,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    /// Inbound `Authorization` header value, forwarded unchanged
    pub authorization: SecretString,
    pub content_type: Option<String>,
    pub body: Option<Bytes>,
}

impl ForwardRequest {
    #[must_use]
    pub fn new(method: Method, authorization: impl Into<String>) -> Self {
        Self {
            method,
            query: None,
            authorization: SecretString::from(authorization.into()),
            content_type: None,
            body: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    #[must_use]
    pub fn with_body(mut self, content_type: Option<String>, body: Bytes) -> Self {
        self.content_type = content_type;
        self.body = (!body.is_empty()).then_some(body);
        self
    }

    /// Retrying is only safe when repeating the call has no extra effect
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self.method,
            Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
        )
    }

    /// Candidate path with this request's query string appended
    pub fn path_with_query(&self, path: &str) -> String {
        match &self.query {
            Some(query) if path.contains('?') => format!("{}&{}", path, query),
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        }
    }
}

/// Response received from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl UpstreamResponse {
    #[must_use]
    pub fn new(status: u16, content_type: Option<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, Some("application/json".to_string()), body.to_string())
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, Some("text/plain".to_string()), body)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }

    /// Normalize the body to JSON.
    ///
    /// JSON bodies are parsed as-is; anything else (including malformed
    /// JSON) is wrapped as `{"message": <raw text>}`.
    pub fn into_json(self) -> Value {
        if self.is_json() {
            if let Ok(value) = serde_json::from_str::<Value>(&self.body) {
                return value;
            }
        }
        json!({ "message": self.body })
    }
}

/// Ordered candidate backend paths for one proxy route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    candidates: Vec<String>,
}

impl ProxyTarget {
    #[must_use]
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            candidates: vec![normalize_path(path.into())],
        }
    }

    /// Primary path followed by fallbacks, tried in order
    #[must_use]
    pub fn with_fallbacks<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let candidates: Vec<String> = paths
            .into_iter()
            .map(|p| normalize_path(p.into()))
            .collect();
        if candidates.is_empty() {
            return Self::single("/");
        }
        Self { candidates }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

/// Error body produced by the gateway itself
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Error type identifier
    #[schema(example = "authentication_error")]
    pub error: String,
    /// Human-readable error message
    #[schema(example = "Authorization header is required")]
    pub message: String,
}

impl ApiErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded but functional
    Degraded,
    /// Critical systems unavailable
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall gateway status
    pub status: HealthStatus,
    /// Marketplace backend reachability
    pub backend: HealthStatus,
    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(backend: HealthStatus) -> Self {
        // The gateway itself is up; an unreachable backend only degrades it
        let status = match backend {
            HealthStatus::Healthy => HealthStatus::Healthy,
            HealthStatus::Degraded | HealthStatus::Unhealthy => HealthStatus::Degraded,
        };
        Self {
            status,
            backend,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
