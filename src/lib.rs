//! Marketplace gateway: an authenticated proxy in front of the agricultural
//! marketplace backend, plus the retry and timeout utilities it runs on.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;
pub mod resilience;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
