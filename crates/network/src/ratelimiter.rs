// -------------------------------------------------------------------------------------------------
//  Copyright (c) 2026 HyQuery Contributors
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// -------------------------------------------------------------------------------------------------

//! A per-source token-bucket rate limiter.
//!
//! Keyed by the requester's IP address (not the full socket address --
//! ephemeral source ports must not let a single client multiply its quota).
//! Buckets refill continuously rather than resetting on an interval
//! boundary, and idle buckets are reclaimed by a periodic sweep so a churn
//! of one-off source addresses cannot grow the map without bound.

use std::{net::IpAddr, sync::Arc, time::Duration};

use dashmap::DashMap;
use hyquery_core::{Clock, MonotonicNanos};

/// Configuration for a [`RateLimiter`].
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    /// Maximum tokens a bucket may hold (and thus the largest burst admitted).
    pub capacity: f64,
    /// Tokens restored per second of elapsed time.
    pub refill_per_second: f64,
    /// A bucket that hasn't been touched for this long is evicted by `gc`.
    pub idle_eviction_after: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 20.0,
            refill_per_second: 5.0,
            idle_eviction_after: Duration::from_secs(120),
        }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: MonotonicNanos,
    last_seen: MonotonicNanos,
}

/// A per-source-IP token bucket rate limiter.
pub struct RateLimiter {
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
    buckets: DashMap<IpAddr, Bucket>,
}

impl RateLimiter {
    /// Builds a rate limiter with the given configuration and clock.
    #[must_use]
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            buckets: DashMap::new(),
        }
    }

    /// Attempts to admit one request from `addr`, returning whether it was allowed.
    ///
    /// Refills the bucket for `addr` to the current instant before spending
    /// a token, so a source that has been idle for a while always starts
    /// from a partially- or fully-replenished bucket rather than being
    /// penalized for the gap.
    pub fn check(&self, addr: IpAddr) -> bool {
        let now = self.clock.monotonic_nanos();
        let mut bucket = self.buckets.entry(addr).or_insert_with(|| Bucket {
            tokens: self.config.capacity,
            last_refill: now,
            last_seen: now,
        });

        let elapsed = now.since(bucket.last_refill);
        let refill = elapsed.as_secs_f64() * self.config.refill_per_second;
        bucket.tokens = (bucket.tokens + refill).min(self.config.capacity);
        bucket.last_refill = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Evicts buckets that have not been touched within the configured idle window.
    ///
    /// Intended to be called periodically (e.g. once a minute) from the
    /// server's background-task set, not from the hot request path.
    pub fn gc(&self) {
        let now = self.clock.monotonic_nanos();
        self.buckets.retain(|_, bucket| {
            now.since(bucket.last_seen) < self.config.idle_eviction_after
        });
    }

    /// Number of distinct sources currently tracked. Exposed for tests and metrics.
    #[must_use]
    pub fn tracked_sources(&self) -> usize {
        self.buckets.len()
    }
}
