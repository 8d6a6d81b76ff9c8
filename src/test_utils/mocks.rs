//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::Method;
use secrecy::ExposeSecret;

use crate::domain::{
    AppError, BackendClient, ExternalServiceError, ForwardRequest, UpstreamResponse,
};

/// Scripted reply for one call to a path
#[derive(Debug, Clone)]
pub enum MockReply {
    /// JSON body with the given status
    Json(u16, serde_json::Value),
    /// Plain-text body with the given status
    Status(u16, String),
    /// Transport failure
    NetworkError(String),
    /// Sleep, then answer 200 `{}`
    Delayed(Duration),
}

/// A call observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub authorization: String,
    pub body: Option<String>,
}

/// Mock backend client for testing.
///
/// Unscripted paths answer `404 Not Found`. A scripted sequence is consumed
/// call by call; its final reply repeats once the rest are used up.
pub struct MockBackendClient {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    is_healthy: AtomicBool,
}

impl MockBackendClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            is_healthy: AtomicBool::new(true),
        }
    }

    /// Answer every call to `path` with `reply`
    pub fn reply(&self, path: &str, reply: MockReply) {
        self.reply_sequence(path, vec![reply]);
    }

    /// Answer successive calls to `path` from `replies`
    pub fn reply_sequence(&self, path: &str, replies: Vec<MockReply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(path.to_string(), replies.into_iter().collect());
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    /// All calls in order (for testing)
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self, path: &str) -> Option<MockReply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockBackendClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendClient for MockBackendClient {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::ExternalService(ExternalServiceError::Unavailable(
                "Unhealthy".to_string(),
            )));
        }
        Ok(())
    }

    async fn send(&self, request: &ForwardRequest, path: &str) -> Result<UpstreamResponse, AppError> {
        let full_path = request.path_with_query(path);
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            path: full_path,
            authorization: request.authorization.expose_secret().to_string(),
            body: request
                .body
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        });

        match self.next_reply(path) {
            None => Ok(UpstreamResponse::text(404, "Not Found")),
            Some(MockReply::Json(status, body)) => Ok(UpstreamResponse::json(status, &body)),
            Some(MockReply::Status(status, body)) => Ok(UpstreamResponse::text(status, body)),
            Some(MockReply::NetworkError(message)) => Err(AppError::ExternalService(
                ExternalServiceError::Network(message),
            )),
            Some(MockReply::Delayed(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(UpstreamResponse::json(200, &serde_json::json!({})))
            }
        }
    }
}
