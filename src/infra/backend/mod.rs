//! Marketplace backend client and its configuration.

pub mod config;
pub mod http;

pub use config::{API_PREFIX, BackendConfig, FALLBACK_BACKEND_URL, resolve_backend_base_url};
pub use http::{HttpBackendClient, REQUEST_ID_HEADER};
