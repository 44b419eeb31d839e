//! Sliding-window admission control (component C4).
//!
//! A request-rate throttle, as opposed to a concurrency limiter: this
//! module tracks a queue of admission timestamps within the trailing
//! `window` and blocks new admissions once `max_requests` of them fall
//! inside it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Configuration for the sliding-window limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_requests: 100,
            window: Duration::from_secs(1),
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn conservative() -> Self {
        RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(1),
        }
    }
}

struct Inner {
    timestamps: VecDeque<Instant>,
}

/// A sliding-window rate limiter shared by clone across the client.
/// Admission order across concurrent waiters is FIFO because each waiter
/// holds the mutex exclusively while deciding, and `tokio::sync::Mutex`
/// wakes its queue in acquisition order.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    inner: Arc<Mutex<Inner>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            inner: Arc::new(Mutex::new(Inner {
                timestamps: VecDeque::new(),
            })),
        }
    }

    /// Suspend until admission is granted, then record the admission.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut inner = self.inner.lock().await;
                let now = Instant::now();
                evict_expired(&mut inner.timestamps, now, self.config.window);

                if inner.timestamps.len() < self.config.max_requests {
                    inner.timestamps.push_back(now);
                    return;
                }

                let oldest = *inner.timestamps.front().expect("non-empty: len >= max_requests > 0 or loop would have admitted");
                let elapsed = now.saturating_duration_since(oldest);
                self.config.window.saturating_sub(elapsed)
            };

            if wait.is_zero() {
                // Window boundary raced with eviction; retry immediately
                // rather than sleeping for zero duration in a tight loop.
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(wait).await;
            }
        }
    }
}

fn evict_expired(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = timestamps.front() {
        if now.saturating_duration_since(front) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
