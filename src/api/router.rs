//! Router assembly and cross-cutting layers.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{any, get},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;

use super::handlers::{
    ApiDoc, farmer_orders_handler, health_check_handler, liveness_handler, products_handler,
    proxy_handler, readiness_handler,
};

/// Largest request body forwarded to the backend (product image uploads included)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Methods advertised to browsers
pub const CORS_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

const CORS_METHODS_VALUE: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const CORS_HEADERS_VALUE: &str = "Content-Type, Authorization";

/// Permissive CORS: any origin, the proxied methods, and the two headers clients send.
///
/// Pre-flight `OPTIONS` requests are answered here with a bare 200.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/api/products", any(products_handler))
        .route("/api/farmer/orders", any(farmer_orders_handler))
        .route("/api/{*path}", any(proxy_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        // CorsLayer only sends these on pre-flight; clients expect them on every response
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_METHODS_VALUE),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_HEADERS_VALUE),
        ))
        .layer(cors_layer())
        .with_state(state)
}
