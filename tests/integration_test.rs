//! Integration tests for the API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use marketplace_gateway::api::create_router;
use marketplace_gateway::app::AppState;
use marketplace_gateway::domain::{ApiErrorResponse, HealthResponse, HealthStatus};
use marketplace_gateway::infra::BackendConfig;
use marketplace_gateway::test_utils::{MockBackendClient, MockReply};

fn create_test_state(mock: &Arc<MockBackendClient>) -> Arc<AppState> {
    let config = BackendConfig::default().with_request_deadline(Duration::from_secs(60));
    Arc::new(AppState::new(Arc::clone(mock) as _, config))
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer farmer-token")
}

async fn body_json(response: axum::response::Response) -> Value {
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body_bytes).unwrap()
}

#[tokio::test]
async fn test_missing_authorization_is_401() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let request = Request::builder()
        .method("GET")
        .uri("/api/products")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: ApiErrorResponse =
        serde_json::from_value(body_json(response).await).unwrap();
    assert!(!body.success);
    assert_eq!(body.message, "Authorization header is required");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_blank_authorization_is_401() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let request = Request::builder()
        .method("GET")
        .uri("/api/wallet")
        .header(header::AUTHORIZATION, "   ")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authorization_forwarded_unchanged() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/wallet", MockReply::Json(200, json!({"balance": 1200})));
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/wallet").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"balance": 1200}));

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].authorization, "Bearer farmer-token");
}

#[tokio::test]
async fn test_products_fall_back_to_second_candidate() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply(
        "/marketplace/products",
        MockReply::Json(200, json!({"success": true, "data": []})),
    );
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/products?category=grain&page=2")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        mock.paths_called(),
        vec![
            "/products?category=grain&page=2",
            "/marketplace/products?category=grain&page=2"
        ]
    );
}

#[tokio::test]
async fn test_farmer_orders_error_relayed_without_fallback() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply(
        "/farmer/orders",
        MockReply::Json(403, json!({"success": false, "message": "Not a farmer"})),
    );
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/farmer/orders").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({"success": false, "message": "Not a farmer"})
    );
    assert_eq!(mock.paths_called(), vec!["/farmer/orders"]);
}

#[tokio::test]
async fn test_farmer_orders_probe_all_candidates() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/orders/my-orders", MockReply::Json(200, json!([])));
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/farmer/orders").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        mock.paths_called(),
        vec!["/farmer/orders", "/orders/farmer", "/orders/my-orders"]
    );
}

#[tokio::test]
async fn test_text_response_wrapped_as_message() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/reports/summary", MockReply::Status(500, "database offline".into()));
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/reports/summary").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"message": "database offline"})
    );
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_backend_is_502() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/products", MockReply::NetworkError("connection refused".into()));
    mock.reply(
        "/marketplace/products",
        MockReply::NetworkError("connection refused".into()),
    );
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/products").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Backend service unreachable"));
}

#[tokio::test]
async fn test_post_body_and_content_type_forwarded() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/orders", MockReply::Json(201, json!({"id": "ord_1"})));
    let router = create_router(create_test_state(&mock));

    let payload = json!({"product_id": "p_9", "quantity": 4});
    let request = authed("POST", "/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let calls = mock.calls();
    assert_eq!(calls[0].method, axum::http::Method::POST);
    let forwarded: Value = serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(forwarded, payload);
}

#[tokio::test]
async fn test_no_content_relayed_without_body() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/cart/items/7", MockReply::Status(204, String::new()));
    let router = create_router(create_test_state(&mock));

    let request = authed("DELETE", "/api/cart/items/7").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body_bytes.is_empty());
}

#[tokio::test]
async fn test_preflight_returns_bare_200_with_cors_headers() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/products")
        .header(header::ORIGIN, "https://market.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"));
    assert!(methods.contains("DELETE"));
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("authorization"));
    assert!(allowed.contains("content-type"));

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body_bytes.is_empty());
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_error_responses_carry_cors_origin() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let request = Request::builder()
        .method("GET")
        .uri("/api/products")
        .header(header::ORIGIN, "https://market.example")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_catch_all_path_forwarded_still_encoded() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/items/a%23b", MockReply::Json(200, json!({"id": "a#b"})));
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/items/a%23b?page=2")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.paths_called(), vec!["/items/a%23b?page=2"]);
}

#[tokio::test]
async fn test_encoded_separators_stay_in_one_segment() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/files/a%2Fb%3Fc")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(mock.paths_called(), vec!["/files/a%2Fb%3Fc"]);
}

fn assert_cors_headers(headers: &header::HeaderMap) {
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    for method in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
        assert!(methods.contains(method), "missing {method} in {methods}");
    }
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type"));
    assert!(allowed.contains("authorization"));
}

#[tokio::test]
async fn test_successful_response_carries_full_cors_headers() {
    let mock = Arc::new(MockBackendClient::new());
    mock.reply("/products", MockReply::Json(200, json!({"data": []})));
    let router = create_router(create_test_state(&mock));

    let request = authed("GET", "/api/products")
        .header(header::ORIGIN, "https://market.example")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors_headers(response.headers());
}

#[tokio::test]
async fn test_unauthorized_response_carries_full_cors_headers() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let request = Request::builder()
        .method("GET")
        .uri("/api/farmer/orders")
        .header(header::ORIGIN, "https://market.example")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_cors_headers(response.headers());
}

#[tokio::test]
async fn test_health_check_healthy() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.backend, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_readiness_reflects_backend() {
    let mock = Arc::new(MockBackendClient::new());
    let router = create_router(create_test_state(&mock));

    let ready = |router: axum::Router| async move {
        let request = Request::builder()
            .method("GET")
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    };

    assert_eq!(ready(router.clone()).await, StatusCode::OK);
    mock.set_healthy(false);
    assert_eq!(ready(router.clone()).await, StatusCode::SERVICE_UNAVAILABLE);

    let live = Request::builder()
        .method("GET")
        .uri("/health/live")
        .body(Body::empty())
        .unwrap();
    assert_eq!(router.oneshot(live).await.unwrap().status(), StatusCode::OK);
}
