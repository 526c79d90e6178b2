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

//! A decorrelated-jitter-free exponential backoff, used between retries of
//! the shared-store publisher loop and the UDP coordinator's reconnect
//! attempts.

use std::time::Duration;

use rand::Rng;

use crate::error::BackoffError;

const MIN_FACTOR: f64 = 1.0;
const MAX_FACTOR: f64 = 100.0;

/// Tracks the current delay of an exponential backoff sequence.
///
/// `next_duration` is the only mutating step; `current_delay` is a pure
/// read of the delay that the *next* call to `next_duration` would grow
/// from (not the delay it would return, which additionally adds jitter).
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter_ms: u64,
    immediate_first: bool,
    current: Duration,
    pending_immediate: bool,
}

impl ExponentialBackoff {
    /// Builds a new backoff sequence.
    ///
    /// `factor` must be in `[1.0, 100.0]` and `initial` must not exceed `max`.
    pub fn new(
        initial: Duration,
        max: Duration,
        factor: f64,
        jitter_ms: u64,
        immediate_first: bool,
    ) -> Result<Self, BackoffError> {
        if !(MIN_FACTOR..=MAX_FACTOR).contains(&factor) {
            return Err(BackoffError::FactorOutOfRange(factor.to_string()));
        }
        if initial > max {
            return Err(BackoffError::InitialExceedsMax {
                initial_ms: initial.as_millis(),
                max_ms: max.as_millis(),
            });
        }

        Ok(Self {
            initial,
            max,
            factor,
            jitter_ms,
            immediate_first,
            current: initial,
            pending_immediate: immediate_first,
        })
    }

    /// Returns the base delay (pre-jitter) that the next call would grow from.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.current
    }

    /// Returns the next delay to wait, advancing the sequence.
    ///
    /// If this backoff was constructed with `immediate_first`, the very
    /// first call returns `Duration::ZERO` without consuming a step of
    /// growth; every call after that grows the base delay by `factor`,
    /// clamped to `max`, and adds up to `jitter_ms` milliseconds of
    /// uniform random jitter.
    pub fn next_duration(&mut self) -> Duration {
        if self.pending_immediate {
            self.pending_immediate = false;
            return Duration::ZERO;
        }

        let base = self.current;
        let jitter = if self.jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=self.jitter_ms))
        } else {
            Duration::ZERO
        };

        let grown_secs = (base.as_secs_f64() * self.factor).min(self.max.as_secs_f64());
        self.current = Duration::from_secs_f64(grown_secs).min(self.max);

        base + jitter
    }

    /// Restores the sequence to its just-constructed state.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.pending_immediate = self.immediate_first;
    }
}
