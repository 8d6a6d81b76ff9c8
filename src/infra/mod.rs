//! Infrastructure layer implementations.

pub mod backend;

pub use backend::{BackendConfig, HttpBackendClient, resolve_backend_base_url};
