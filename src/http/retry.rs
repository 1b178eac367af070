//! Bounded retry decorator
//!
//! Success and client errors (status in `[200, 500)`) are returned on the
//! first attempt. Transient failures, meaning connection errors, timeouts and
//! 5xx answers, are retried until the attempt budget is spent. Any other
//! error from the inner stage is returned immediately.

use super::transport::{Disposition, RequestDescriptor, ResponseOutcome, Transport};
use crate::config::HttpSettings;
use crate::error::{Error, Result};
use crate::types::BackoffType;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Attempt budget and delay schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default backoff
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Create a policy from transport settings
    pub fn from_settings(settings: &HttpSettings) -> Self {
        Self {
            max_attempts: settings.max_retries,
            backoff_type: settings.backoff,
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
        }
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Retry immediately
    #[must_use]
    pub fn without_backoff(self) -> Self {
        self.backoff(BackoffType::Constant, Duration::ZERO, Duration::ZERO)
    }

    /// Effective attempt count (never below one)
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after the given failed attempt (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

/// Re-executes the inner transport on transient failure
#[derive(Debug, Clone)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    /// Wrap `inner` with the given policy
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseOutcome> {
        let attempts = self.policy.attempts();
        let mut last_error: Option<Error> = None;
        let mut last_status = None;

        for attempt in 1..=attempts {
            debug!(
                attempt,
                attempts,
                method = %request.method(),
                url = %request.url(),
                "attempting request"
            );

            match self.inner.execute(request).await {
                Ok(outcome) if outcome.disposition() == Disposition::Terminal => return Ok(outcome),
                Ok(outcome) => {
                    warn!(
                        attempt,
                        attempts,
                        status = outcome.status,
                        url = %request.url(),
                        "server error, retrying"
                    );
                    last_status = Some(outcome.status);
                    last_error = None;
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, attempts, error = %e, url = %request.url(), "request failed, retrying");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt < attempts {
                let delay = self.policy.delay_for(attempt - 1);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        error!(
            attempts,
            method = %request.method(),
            url = %request.url(),
            "all attempts failed"
        );
        Err(last_error.unwrap_or(Error::TransportExhausted {
            attempts,
            last_status,
        }))
    }
}
