//! Minimum-interval throttle for outbound image-search requests.
//!
//! Image APIs meter free keys aggressively, and shuffle timers across many
//! open panes can fire in bursts. [`RateLimiter`] spaces call *starts* at
//! least `min_interval` apart. It does not serialize execution: once a call
//! has waited for its slot it runs concurrently with whatever else is in
//! flight.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::trace;

/// Configuration for the outbound rate limiter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum gap between two request starts. Default: 1000ms.
    #[serde(with = "crate::cache::millis")]
    pub min_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1000),
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }
}

/// Spaces request starts by at least `min_interval`.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    /// Start time reserved by the most recent call.
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.min_interval)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for the next free slot, then run `f`.
    ///
    /// The slot is reserved before sleeping, so overlapping callers queue up
    /// one interval apart instead of all waking at once. Whatever `f`
    /// returns, errors included, is passed through untouched.
    pub async fn schedule<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self.reserve();
        let now = Instant::now();
        if slot > now {
            trace!(wait_ms = (slot - now).as_millis() as u64, "rate limiter delaying request");
            tokio::time::sleep_until(slot).await;
        }
        f().await
    }

    /// Forget the last request time, e.g. after a settings change.
    pub fn reset(&self) {
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn reserve(&self) -> Instant {
        let mut last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let slot = match *last {
            Some(prev) => now.max(prev + self.min_interval),
            None => now,
        };
        *last = Some(slot);
        slot
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
