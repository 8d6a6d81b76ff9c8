//! Timeout wrapper and cooperative cancellation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The wrapped operation did not settle before its deadline
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation timed out after {}ms", duration.as_millis())]
pub struct TimeoutError {
    pub duration: Duration,
}

/// Outcome of a [`CancellableOperation`] that did not produce a value
#[derive(Debug, Error)]
pub enum OperationError<E> {
    #[error("{0}")]
    Failed(E),
    #[error(transparent)]
    TimedOut(TimeoutError),
    #[error("operation cancelled")]
    Cancelled,
}

impl<E> OperationError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Race `future` against a timer of `duration`.
///
/// The future's own output is returned unchanged if it settles first.
pub async fn with_timeout<F>(duration: Duration, future: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// A deadline paired with a cancellation signal the operation can observe.
///
/// The signal fires on explicit [`cancel`](Self::cancel), on cancellation of
/// a parent token, or when the deadline passes.
#[derive(Debug, Clone)]
pub struct CancellableOperation {
    token: CancellationToken,
    duration: Duration,
}

impl CancellableOperation {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            duration,
        }
    }

    /// Cancelled whenever `parent` is
    #[must_use]
    pub fn child_of(parent: &CancellationToken, duration: Duration) -> Self {
        Self {
            token: parent.child_token(),
            duration,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `operation` with the signal until it settles, times out or is cancelled.
    ///
    /// The timer lives inside this future and is dropped on every exit path.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, OperationError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.token.is_cancelled() {
            return Err(OperationError::Cancelled);
        }

        let work = operation(self.token.clone());
        let deadline = tokio::time::sleep(self.duration);

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(OperationError::Cancelled),
            result = work => result.map_err(OperationError::Failed),
            _ = deadline => {
                debug!(timeout_ms = self.duration.as_millis() as u64, "Operation deadline reached");
                self.token.cancel();
                Err(OperationError::TimedOut(TimeoutError { duration: self.duration }))
            }
        }
    }
}
