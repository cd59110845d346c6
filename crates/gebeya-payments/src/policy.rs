//! Timeout and retry policies for gateway calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout configuration for a gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout.
    #[serde(with = "millis")]
    pub connect: Duration,
    /// Total time for one attempt.
    #[serde(with = "millis")]
    pub total: Duration,
}

impl TimeoutConfig {
    pub fn new(connect: Duration, total: Duration) -> Self {
        Self { connect, total }
    }

    /// Create from a single total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: Duration::from_millis(total.as_millis() as u64 / 4),
            total,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            total: Duration::from_secs(10),
        }
    }
}

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Fixed delay between retries.
    Fixed {
        #[serde(with = "millis")]
        delay: Duration,
    },
    /// Exponential backoff with base and max.
    Exponential {
        #[serde(with = "millis")]
        base: Duration,
        #[serde(with = "millis")]
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay } => *delay,
            Self::Exponential { base, max } => {
                let multiplier = 2u64.saturating_pow(attempt);
                let delay = Duration::from_millis((base.as_millis() as u64).saturating_mul(multiplier));
                std::cmp::min(delay, *max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            max: Duration::from_secs(2),
        }
    }
}

/// Retry policy for connection errors, timeouts and 5xx answers.
///
/// Client errors (4xx) are never retried: the gateway has seen the request
/// and a retry would only repeat the refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::default(),
        }
    }

    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::None,
        }
    }

    /// Set backoff strategy.
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Check if should retry based on status code.
    pub fn should_retry_status(&self, status: u16, attempt: u32) -> bool {
        attempt < self.max_retries && (500..600).contains(&status)
    }

    /// Check if should retry after a timeout or connection error.
    pub fn should_retry_transport(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Timeout plus retry configuration for one gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPolicy {
    #[serde(default)]
    pub timeout: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl GatewayPolicy {
    pub fn new(timeout: TimeoutConfig, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
