// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Minimum-interval gate keyed by endpoint.
//!
//! Unlike a token bucket this never waits: a request inside the interval is
//! refused and the caller drops it. The polling loop will ask again on its
//! next tick, so delaying would only pile up stale batches.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Per-key minimum interval limiter.
///
/// # Example
///
/// ```rust
/// use chaincache::transport::RateLimiter;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let limiter = RateLimiter::new(Duration::from_secs(1));
/// assert!(limiter.take("https://a.example"));
/// assert!(!limiter.take("https://a.example"));
/// assert!(limiter.take("https://b.example"));
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    limit: Duration,
    last: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing one use per key every `limit`.
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// The configured interval.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Returns true and records the use if `key` was last used at least
    /// `limit` ago (or never). Returns false without side effects otherwise.
    pub fn take(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match last.get(key) {
            Some(previous) if now.saturating_duration_since(*previous) < self.limit => false,
            _ => {
                last.insert(key.to_owned(), now);
                true
            }
        }
    }

    /// Records a use of `key` at `at`.
    pub fn reset(&self, key: &str, at: Instant) {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), at);
    }
}
