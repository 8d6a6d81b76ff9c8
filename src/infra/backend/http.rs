//! Marketplace backend client over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::ExposeSecret;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::domain::{
    AppError, BackendClient, ConfigError, ExternalServiceError, ForwardRequest, UpstreamResponse,
};
use crate::resilience::with_timeout;

use super::config::BackendConfig;

/// Header carrying a per-call correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// [`BackendClient`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    http_client: Client,
    base_url: String,
    upstream_timeout: Duration,
}

impl HttpBackendClient {
    /// Create a client for the configured backend
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .connect_timeout(config.upstream_timeout())
            .build()
            .map_err(|e| AppError::Config(ConfigError::HttpClient(e.to_string())))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upstream_timeout: config.upstream_timeout(),
        })
    }

    /// Base URL requests are sent to, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn health_check(&self) -> Result<(), AppError> {
        let call = self.http_client.get(&self.base_url).send();
        let response = with_timeout(self.upstream_timeout, call)
            .await?
            .map_err(|e| AppError::ExternalService(ExternalServiceError::Network(e.to_string())))?;

        // Any answer below 5xx means the backend is up
        if response.status().is_server_error() {
            return Err(AppError::ExternalService(ExternalServiceError::Unavailable(
                format!("Backend health check returned {}", response.status()),
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(method = %request.method))]
    async fn send(&self, request: &ForwardRequest, path: &str) -> Result<UpstreamResponse, AppError> {
        let url = self.url_for(&request.path_with_query(path));
        let request_id = Uuid::new_v4().to_string();

        debug!(url = %url, request_id = %request_id, "Forwarding request to backend");

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, request.authorization.expose_secret())
            .header(REQUEST_ID_HEADER, &request_id);

        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(UpstreamResponse::new(status, content_type, body))
        };

        let response = with_timeout(self.upstream_timeout, exchange)
            .await
            .inspect_err(|e| error!(url = %url, error = %e, "Backend request timed out"))?
            .map_err(|e| {
                error!(url = %url, error = %e, "Backend request failed");
                AppError::ExternalService(ExternalServiceError::Network(e.to_string()))
            })?;

        debug!(url = %url, status = response.status, "Backend responded");
        Ok(response)
    }
}
