//! Named retry presets.

use std::fmt;
use std::time::Duration;

use super::retry::{Backoff, RetryPolicy};

/// Named preset selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPreset {
    /// General network calls
    Network,
    /// Large request bodies, few and slow attempts
    Upload,
    /// Calls that must get through
    Critical,
    /// Interactive calls with a tight latency budget
    #[default]
    Quick,
}

impl RetryPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Upload => "upload",
            Self::Critical => "critical",
            Self::Quick => "quick",
        }
    }

    /// Build the policy this preset names
    pub fn policy<E>(self) -> RetryPolicy<E> {
        match self {
            Self::Network => RetryPolicy::network(),
            Self::Upload => RetryPolicy::upload(),
            Self::Critical => RetryPolicy::critical(),
            Self::Quick => RetryPolicy::quick(),
        }
    }
}

impl std::str::FromStr for RetryPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(Self::Network),
            "upload" => Ok(Self::Upload),
            "critical" => Ok(Self::Critical),
            "quick" => Ok(Self::Quick),
            other => Err(format!("Invalid retry preset: {}", other)),
        }
    }
}

impl fmt::Display for RetryPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<E> RetryPolicy<E> {
    /// 3 attempts, 1s exponential, capped at 10s
    #[must_use]
    pub fn network() -> Self {
        Self::new(
            3,
            Duration::from_millis(1_000),
            Backoff::Exponential,
            Duration::from_millis(10_000),
        )
    }

    /// 2 attempts, 2s linear, capped at 10s
    #[must_use]
    pub fn upload() -> Self {
        Self::new(
            2,
            Duration::from_millis(2_000),
            Backoff::Linear,
            Duration::from_millis(10_000),
        )
    }

    /// 5 attempts, 500ms exponential, capped at 30s
    #[must_use]
    pub fn critical() -> Self {
        Self::new(
            5,
            Duration::from_millis(500),
            Backoff::Exponential,
            Duration::from_millis(30_000),
        )
    }

    /// 2 attempts, 200ms linear, capped at 1s
    #[must_use]
    pub fn quick() -> Self {
        Self::new(
            2,
            Duration::from_millis(200),
            Backoff::Linear,
            Duration::from_millis(1_000),
        )
    }
}
