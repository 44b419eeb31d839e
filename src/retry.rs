//! Retry eligibility and jittered exponential backoff (component C3).
//!
//! Classification is by the error's tagged variant, never by inspecting
//! message text — `HttpError::is_timeout`/`is_connection_error` are the
//! only inputs besides the status code.

use crate::error::HttpError;
use rand::Rng;
use std::time::Duration;

/// Retry policy configuration. One `RetryState` (below) is created per
/// top-level `execute` call from a `RetryConfig` shared by the client.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub retry_on_timeout: bool,
    pub retry_on_connection_error: bool,
    pub retry_on_5xx: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            retry_on_timeout: true,
            retry_on_connection_error: true,
            retry_on_5xx: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    #[must_use]
    pub fn disabled() -> Self {
        RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        }
    }

    /// Shorter delays, more attempts — useful against local test servers.
    #[must_use]
    pub fn aggressive() -> Self {
        RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_secs(1),
            backoff_factor: 1.5,
            ..RetryConfig::default()
        }
    }
}

/// Per-call retry bookkeeping. The executor creates one of these at the
/// start of `execute` and threads it through every attempt.
#[derive(Debug, Clone)]
pub struct RetryState {
    config: RetryConfig,
    attempt: usize,
}

/// The outcome the executor feeds back to decide whether another attempt
/// is eligible.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    Error(&'a HttpError),
    Status(u16),
}

impl RetryState {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        RetryState { config, attempt: 0 }
    }

    #[must_use]
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// True iff another attempt is both budgeted and eligible for this
    /// outcome. Does not mutate state; call `record_retry` after deciding
    /// to retry.
    #[must_use]
    pub fn should_retry(&self, outcome: AttemptOutcome<'_>) -> bool {
        if self.attempt >= self.config.max_retries {
            return false;
        }
        match outcome {
            AttemptOutcome::Error(err) => {
                (self.config.retry_on_timeout && err.is_timeout())
                    || (self.config.retry_on_connection_error && err.is_connection_error())
            }
            AttemptOutcome::Status(status) => {
                self.config.retry_on_5xx && (500..600).contains(&status)
            }
        }
    }

    /// Advance the attempt counter and compute the backoff delay for the
    /// attempt that is about to happen.
    pub fn record_retry(&mut self) -> Duration {
        let delay = backoff_delay(&self.config, self.attempt + 1);
        self.attempt += 1;
        delay
    }
}

/// Backoff delay for `attempt`: attempt 0 is `initial_delay` verbatim;
/// attempt k >= 1 is `initial * factor^k`, scaled by a uniform jitter
/// factor in [0.75, 1.25], capped at `max_delay`.
#[must_use]
pub fn backoff_delay(config: &RetryConfig, attempt: usize) -> Duration {
    if attempt == 0 {
        return config.initial_delay;
    }

    let factor = if config.backoff_factor.is_finite() && config.backoff_factor > 0.0 {
        config.backoff_factor
    } else {
        1.0
    };

    let base_secs = config.initial_delay.as_secs_f64() * factor.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
    let base_secs = base_secs.clamp(0.0, config.max_delay.as_secs_f64().max(0.0));

    let jitter = rand::rng().random_range(0.75..=1.25);
    let jittered_secs = (base_secs * jitter).min(config.max_delay.as_secs_f64());

    Duration::from_secs_f64(jittered_secs.max(0.0))
}
