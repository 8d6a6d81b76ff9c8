//! Proxy service: candidate probing, retries and the request deadline.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    AppError, BackendClient, ExternalServiceError, ForwardRequest, HealthResponse, HealthStatus,
    ProxyTarget, UpstreamResponse,
};
use crate::infra::BackendConfig;
use crate::resilience::{CancellableOperation, OperationError, RetryPolicy, retry};

/// Message returned when no candidate path could be reached
pub const UNREACHABLE_MESSAGE: &str = "Backend service unreachable";

/// Application service forwarding requests to the backend
pub struct ProxyService {
    backend_client: Arc<dyn BackendClient>,
    config: BackendConfig,
}

impl ProxyService {
    #[must_use]
    pub fn new(backend_client: Arc<dyn BackendClient>, config: BackendConfig) -> Self {
        Self {
            backend_client,
            config,
        }
    }

    /// Forward `request` to the first candidate path of `target` that exists.
    ///
    /// A 404 moves on to the next candidate; any other status is relayed
    /// immediately. If every candidate answered 404 the last one is relayed.
    /// If no candidate could be reached at all the result is a 502.
    #[instrument(skip(self, target, request), fields(method = %request.method, candidates = target.candidates().len()))]
    pub async fn forward(
        &self,
        target: &ProxyTarget,
        request: &ForwardRequest,
    ) -> Result<UpstreamResponse, AppError> {
        let operation = CancellableOperation::new(self.config.request_deadline());

        operation
            .run(|token| self.probe_candidates(target, request, token))
            .await
            .map_err(|e| match e {
                OperationError::Failed(err) => err,
                OperationError::TimedOut(timeout) => {
                    warn!(timeout_ms = timeout.duration.as_millis() as u64, "Proxy request deadline exceeded");
                    AppError::from(timeout)
                }
                OperationError::Cancelled => {
                    AppError::Internal("Proxy request was cancelled".to_string())
                }
            })
    }

    async fn probe_candidates(
        &self,
        target: &ProxyTarget,
        request: &ForwardRequest,
        token: CancellationToken,
    ) -> Result<UpstreamResponse, AppError> {
        let policy = self.retry_policy(request);
        let mut last_not_found: Option<UpstreamResponse> = None;

        for path in target.candidates() {
            if token.is_cancelled() {
                break;
            }

            let outcome = retry(&policy, |_| self.backend_client.send(request, path)).await;

            match outcome {
                Ok(response) if response.is_not_found() => {
                    debug!(path = %path, "Candidate path not found, trying next");
                    last_not_found = Some(response);
                }
                Ok(response) => {
                    info!(path = %path, status = response.status, "Proxied request");
                    return Ok(response);
                }
                Err(err) => {
                    warn!(
                        path = %path,
                        attempts = err.attempts,
                        error = %err.last_error,
                        "Candidate path unreachable"
                    );
                }
            }
        }

        if let Some(response) = last_not_found {
            return Ok(response);
        }

        Err(AppError::ExternalService(ExternalServiceError::Unavailable(
            UNREACHABLE_MESSAGE.to_string(),
        )))
    }

    /// Only idempotent requests are retried, and only on transient errors
    fn retry_policy(&self, request: &ForwardRequest) -> RetryPolicy<AppError> {
        let base = if request.is_idempotent() {
            self.config.retry_preset.policy()
        } else {
            RetryPolicy::no_retry()
        };

        base.with_predicate(|err: &AppError, _| err.is_transient())
            .with_observer(|err: &AppError, attempt, delay| {
                warn!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying backend call"
                );
            })
    }

    /// Report backend reachability
    pub async fn health_check(&self) -> HealthResponse {
        let backend = match self.backend_client.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Backend health check failed");
                HealthStatus::Unhealthy
            }
        };
        HealthResponse::new(backend)
    }
}
