//! Resilient fetch utilities: retry with backoff, timeouts and cancellation.

pub mod presets;
pub mod retry;
pub mod timeout;

pub use presets::RetryPreset;
pub use retry::{Backoff, RetryError, RetryPolicy, retry};
pub use timeout::{CancellableOperation, OperationError, TimeoutError, with_timeout};
