//! Retry wrapper with linear or exponential backoff.
//!
//! Every call to [`retry`] is independent: the policy is only read, and no
//! state survives between invocations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

type RetryPredicate<E> = Arc<dyn Fn(&E, u32) -> bool + Send + Sync>;
type RetryObserver<E> = Arc<dyn Fn(&E, u32, Duration) + Send + Sync>;

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// `base * attempt`
    Linear,
    /// `base * 2^(attempt - 1)`
    #[default]
    Exponential,
}

impl Backoff {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        }
    }
}

impl std::str::FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            _ => Err(format!("Invalid backoff mode: {}", s)),
        }
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure returned once the retry wrapper gives up
#[derive(Debug, Error)]
#[error("operation failed after {attempts} attempt(s): {last_error}")]
pub struct RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of times the operation was invoked
    pub attempts: u32,
    /// Error returned by the final invocation
    #[source]
    pub last_error: E,
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Unwrap the last underlying error
    pub fn into_inner(self) -> E {
        self.last_error
    }
}

/// Retry configuration applied to a single operation
pub struct RetryPolicy<E> {
    /// Maximum number of invocations (always at least 1)
    pub max_attempts: u32,
    /// Delay unit the backoff is computed from
    pub base_delay: Duration,
    /// How the delay grows with each attempt
    pub backoff: Backoff,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    should_retry: RetryPredicate<E>,
    on_retry: Option<RetryObserver<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            backoff: self.backoff,
            max_delay: self.max_delay,
            should_retry: Arc::clone(&self.should_retry),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("backoff", &self.backoff)
            .field("max_delay", &self.max_delay)
            .field("has_observer", &self.on_retry.is_some())
            .finish()
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::new(
            3,
            Duration::from_millis(1_000),
            Backoff::Exponential,
            Duration::from_millis(10_000),
        )
    }
}

impl<E> RetryPolicy<E> {
    /// Create a policy that retries every error
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: Backoff, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff,
            max_delay,
            should_retry: Arc::new(|_, _| true),
            on_retry: None,
        }
    }

    /// Policy that invokes the operation exactly once
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Backoff::Linear, Duration::ZERO)
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Decide per error and attempt number whether another attempt is made
    #[must_use]
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E, u32) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Observer called with the error, the failed attempt and the upcoming delay
    #[must_use]
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: Fn(&E, u32, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Delay slept after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let max_nanos = self.max_delay.as_nanos();
                1_u128
                    .checked_shl(attempt - 1)
                    .and_then(|factor| self.base_delay.as_nanos().checked_mul(factor))
                    .filter(|nanos| *nanos < max_nanos)
                    .map_or(self.max_delay, duration_from_nanos)
            }
        };
        delay.min(self.max_delay)
    }

    fn should_retry(&self, error: &E, attempt: u32) -> bool {
        attempt < self.max_attempts && (self.should_retry)(error, attempt)
    }
}

/// `nanos` must be below `Duration::MAX`
fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    Duration::new((nanos / NANOS_PER_SEC) as u64, (nanos % NANOS_PER_SEC) as u32)
}

/// Run `operation` until it succeeds or the policy gives up.
///
/// The closure receives the 1-based attempt number. Nothing is slept after
/// the final attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy<E>, mut operation: F) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !policy.should_retry(&error, attempt) {
                    debug!(attempts = attempt, error = %error, "Giving up on operation");
                    return Err(RetryError {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                let delay = policy.delay_for(attempt);
                if let Some(observer) = &policy.on_retry {
                    observer(&error, attempt, delay);
                }
                debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying operation"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
