//! Application layer containing proxy logic and shared state.

pub mod service;
pub mod state;

pub use service::{ProxyService, UNREACHABLE_MESSAGE};
pub use state::AppState;
