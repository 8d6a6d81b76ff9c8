//! Application state management.

use std::sync::Arc;

use crate::domain::BackendClient;
use crate::infra::BackendConfig;

use super::service::ProxyService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProxyService>,
}

impl AppState {
    /// Create a new application state
    #[must_use]
    pub fn new(backend_client: Arc<dyn BackendClient>, config: BackendConfig) -> Self {
        Self {
            service: Arc::new(ProxyService::new(backend_client, config)),
        }
    }
}
