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

//! An injectable clock abstraction.
//!
//! Every component with time-dependent behavior (challenge-token windows,
//! rate-limiter refill, response-cache staleness, worker-registry timeouts,
//! publisher backoff) takes a `Clock` rather than reading the system clock
//! directly, so tests can drive time deterministically without sleeping.

use std::{
    fmt,
    sync::atomic::{AtomicI64, AtomicU64, Ordering},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds since the UNIX epoch (wallclock, may jump with system clock adjustments).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixMillis(pub i64);

impl UnixMillis {
    /// Returns the underlying value as `i64`.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Converts the value to a UTC datetime.
    #[must_use]
    pub fn to_datetime_utc(self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Returns the absolute difference between two timestamps, in milliseconds.
    #[must_use]
    pub fn abs_diff(self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nanoseconds on a monotonic, never-decreasing timeline with an arbitrary epoch.
///
/// Only differences between two `MonotonicNanos` values are meaningful; the
/// absolute value carries no wallclock significance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicNanos(pub u64);

impl MonotonicNanos {
    /// Returns the elapsed duration since an earlier point on the same timeline.
    ///
    /// Saturates at zero if `earlier` is actually later (clamps against clock
    /// skew introduced by a manually-driven test clock).
    #[must_use]
    pub fn since(self, earlier: Self) -> std::time::Duration {
        std::time::Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

/// Source of both wallclock and monotonic time for a running HyQuery instance.
///
/// Implementations must be safe to share across the dispatch threads that
/// invoke the rate limiter, response cache, and coordinator concurrently.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wallclock time, in milliseconds since the UNIX epoch.
    fn unix_millis(&self) -> UnixMillis;

    /// Current point on a monotonic, never-decreasing timeline.
    fn monotonic_nanos(&self) -> MonotonicNanos;
}

/// A `Clock` backed by the operating system's real-time and monotonic clocks.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl SystemClock {
    /// Creates a new system-backed clock, anchoring its monotonic timeline to now.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn unix_millis(&self) -> UnixMillis {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        UnixMillis(now.as_millis() as i64)
    }

    fn monotonic_nanos(&self) -> MonotonicNanos {
        MonotonicNanos(self.epoch.elapsed().as_nanos() as u64)
    }
}

/// A manually-driven `Clock` for deterministic tests.
///
/// Both timelines start at zero and only move when [`StaticClock::advance`]
/// or [`StaticClock::set_unix_millis`] is called.
#[derive(Debug)]
pub struct StaticClock {
    unix_millis: AtomicI64,
    monotonic_nanos: AtomicU64,
}

impl Default for StaticClock {
    fn default() -> Self {
        Self {
            unix_millis: AtomicI64::new(0),
            monotonic_nanos: AtomicU64::new(0),
        }
    }
}

impl StaticClock {
    /// Creates a clock starting at the given wallclock time, with its monotonic
    /// timeline starting at zero.
    #[must_use]
    pub fn at(unix_millis: i64) -> Self {
        Self {
            unix_millis: AtomicI64::new(unix_millis),
            monotonic_nanos: AtomicU64::new(0),
        }
    }

    /// Advances both timelines by `duration`.
    pub fn advance(&self, duration: std::time::Duration) {
        self.unix_millis
            .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
        self.monotonic_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Overrides the wallclock reading without moving the monotonic timeline.
    ///
    /// Useful for exercising wallclock-skew edge cases (e.g. a worker status
    /// packet with a timestamp far in the past or future).
    pub fn set_unix_millis(&self, unix_millis: i64) {
        self.unix_millis.store(unix_millis, Ordering::SeqCst);
    }
}

impl Clock for StaticClock {
    fn unix_millis(&self) -> UnixMillis {
        UnixMillis(self.unix_millis.load(Ordering::SeqCst))
    }

    fn monotonic_nanos(&self) -> MonotonicNanos {
        MonotonicNanos(self.monotonic_nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[test]
    fn system_clock_monotonic_is_non_decreasing() {
        let clock = SystemClock::new();
        let a = clock.monotonic_nanos();
        let b = clock.monotonic_nanos();
        assert!(b.0 >= a.0);
    }

    #[rstest]
    #[case(0, 1_000, 1_000)]
    #[case(5_000, 1_000, 6_000)]
    fn static_clock_advances_both_timelines(
        #[case] start_ms: i64,
        #[case] advance_ms: u64,
        #[case] expected_ms: i64,
    ) {
        let clock = StaticClock::at(start_ms);
        clock.advance(Duration::from_millis(advance_ms));
        assert_eq!(clock.unix_millis().as_i64(), expected_ms);
        assert_eq!(clock.monotonic_nanos().0, advance_ms * 1_000_000);
    }

    #[test]
    fn monotonic_since_saturates_at_zero_on_skew() {
        let later = MonotonicNanos(10);
        let earlier = MonotonicNanos(100);
        assert_eq!(later.since(earlier), Duration::ZERO);
    }

    #[test]
    fn set_unix_millis_does_not_move_monotonic_timeline() {
        let clock = StaticClock::at(0);
        let before = clock.monotonic_nanos();
        clock.set_unix_millis(-60_000);
        assert_eq!(clock.unix_millis().as_i64(), -60_000);
        assert_eq!(clock.monotonic_nanos(), before);
    }
}
