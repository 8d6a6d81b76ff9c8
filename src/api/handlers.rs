//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};
use utoipa::OpenApi;

use crate::app::AppState;
use crate::domain::{
    ApiErrorResponse, AppError, ExternalServiceError, ForwardRequest, HealthResponse, HealthStatus,
    ProxyTarget,
};

/// Backend paths probed for the product catalogue, in order
pub const PRODUCT_PATHS: &[&str] = &["/products", "/marketplace/products"];

/// Backend paths probed for a farmer's incoming orders, in order
pub const FARMER_ORDER_PATHS: &[&str] = &["/farmer/orders", "/orders/farmer", "/orders/my-orders"];

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace Gateway API",
        version = "0.1.0",
        description = "Authenticated proxy in front of the agricultural marketplace backend",
        license(
            name = "MIT"
        )
    ),
    paths(
        products_handler,
        farmer_orders_handler,
        proxy_handler,
        health_check_handler,
        liveness_handler,
        readiness_handler,
    ),
    components(
        schemas(
            ApiErrorResponse,
            HealthResponse,
            HealthStatus,
        )
    ),
    tags(
        (name = "proxy", description = "Requests forwarded to the marketplace backend"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Product catalogue
///
/// Accepts any method. Tries `/products`, then `/marketplace/products` on the
/// backend, moving on only when a candidate answers 404.
#[utoipa::path(
    method(get, post, put, patch, delete),
    path = "/api/products",
    tag = "proxy",
    request_body(content = String, content_type = "application/json", description = "Forwarded unchanged"),
    responses(
        (status = 200, description = "Backend response relayed as JSON"),
        (status = 401, description = "Missing Authorization header", body = ApiErrorResponse),
        (status = 502, description = "Backend unreachable", body = ApiErrorResponse),
        (status = 504, description = "Backend timed out", body = ApiErrorResponse)
    )
)]
pub async fn products_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let target = ProxyTarget::with_fallbacks(PRODUCT_PATHS.iter().copied());
    proxy(&state, &target, method, &uri, &headers, body).await
}

/// Orders placed with the authenticated farmer
///
/// Accepts any method. Candidates are tried in order until one answers
/// something other than 404.
#[utoipa::path(
    method(get, post, put, patch, delete),
    path = "/api/farmer/orders",
    tag = "proxy",
    request_body(content = String, content_type = "application/json", description = "Forwarded unchanged"),
    responses(
        (status = 200, description = "Backend response relayed as JSON"),
        (status = 401, description = "Missing Authorization header", body = ApiErrorResponse),
        (status = 502, description = "Backend unreachable", body = ApiErrorResponse),
        (status = 504, description = "Backend timed out", body = ApiErrorResponse)
    )
)]
pub async fn farmer_orders_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let target = ProxyTarget::with_fallbacks(FARMER_ORDER_PATHS.iter().copied());
    proxy(&state, &target, method, &uri, &headers, body).await
}

/// Generic pass-through
///
/// Forwards `/api/{path}` to `{backend}/{path}` with the same method, query,
/// body and Authorization header. The path is forwarded still percent-encoded.
#[utoipa::path(
    method(get, post, put, patch, delete),
    path = "/api/{path}",
    tag = "proxy",
    params(
        ("path" = String, Path, description = "Backend path, e.g. `wallet/transactions`")
    ),
    request_body(content = String, content_type = "application/json", description = "Forwarded unchanged"),
    responses(
        (status = 200, description = "Backend response relayed as JSON"),
        (status = 401, description = "Missing Authorization header", body = ApiErrorResponse),
        (status = 502, description = "Backend unreachable", body = ApiErrorResponse),
        (status = 504, description = "Backend timed out", body = ApiErrorResponse)
    )
)]
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let target = ProxyTarget::single(backend_path(&uri));
    proxy(&state, &target, method, &uri, &headers, body).await
}

/// Backend path for a catch-all request, taken from the raw URI so encoded
/// `#`, `?` and `/` stay inside the path segment
fn backend_path(uri: &Uri) -> &str {
    let path = uri.path();
    path.strip_prefix("/api").unwrap_or(path)
}

async fn proxy(
    state: &AppState,
    target: &ProxyTarget,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Authentication("Authorization header is required".to_string()))?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let request = ForwardRequest::new(method, authorization)
        .with_query(uri.query().map(str::to_string))
        .with_body(content_type, body);

    let upstream = state.service.forward(target, &request).await?;

    let status = StatusCode::from_u16(upstream.status).map_err(|_| {
        AppError::ExternalService(ExternalServiceError::InvalidResponse(format!(
            "Unexpected status code {}",
            upstream.status
        )))
    })?;
    debug!(status = %status, "Relaying backend response");

    if matches!(status, StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED) {
        return Ok(status.into_response());
    }

    Ok((status, Json(upstream.into_json())).into_response())
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe
///
/// Not ready while the backend is unreachable.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Application is ready to serve traffic"),
        (status = 503, description = "Backend is unreachable")
    )
)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check().await;
    match health.backend {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            AppError::ExternalService(ext_err) => match ext_err {
                ExternalServiceError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                ExternalServiceError::Unavailable(_)
                | ExternalServiceError::Network(_)
                | ExternalServiceError::InvalidResponse(_) => {
                    (StatusCode::BAD_GATEWAY, "external_service_error")
                }
            },
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        // Unavailable is a full sentence meant for the caller
        let message = match self {
            AppError::ExternalService(ExternalServiceError::Unavailable(msg)) => msg,
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        (status, Json(ApiErrorResponse::new(error_type, message))).into_response()
    }
}
