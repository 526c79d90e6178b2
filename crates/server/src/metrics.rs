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

//! A small counter facade, gated by `observability.metricsEnabled`.
//!
//! Not a full metrics backend: no registry, no export format. Counting by
//! relaxed atomic increments keeps the cost of wiring it through the hot
//! dispatch path negligible whether or not it's actually read anywhere.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::MetricsDetail;

/// Query counters, one per endpoint family.
#[derive(Debug, Default)]
pub struct Metrics {
    enabled: bool,
    detail: MetricsDetailLevel,
    v1_basic_queries: AtomicU64,
    v1_full_queries: AtomicU64,
    v2_challenge_queries: AtomicU64,
    v2_basic_queries: AtomicU64,
    v2_players_queries: AtomicU64,
    rate_limit_rejections: AtomicU64,
    cache_rebuilds: AtomicU64,
    coordinator_acks_ok: AtomicU64,
    coordinator_acks_rejected: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum MetricsDetailLevel {
    #[default]
    Basic,
    Detailed,
}

impl Metrics {
    /// Builds a sink. When `enabled` is false every `record_*` call is a no-op.
    #[must_use]
    pub fn new(enabled: bool, detail: MetricsDetail) -> Self {
        Self {
            enabled,
            detail: match detail {
                MetricsDetail::Basic => MetricsDetailLevel::Basic,
                MetricsDetail::Detailed => MetricsDetailLevel::Detailed,
            },
            ..Self::default()
        }
    }

    /// A disabled sink, for embedders that don't configure observability.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(false, MetricsDetail::Basic)
    }

    pub fn record_v1_query(&self, full: bool) {
        if !self.enabled {
            return;
        }
        if full {
            self.v1_full_queries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.v1_basic_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_v2_challenge(&self) {
        if self.enabled {
            self.v2_challenge_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_v2_basic(&self) {
        if self.enabled {
            self.v2_basic_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_v2_players(&self) {
        if self.enabled {
            self.v2_players_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rate_limit_rejection(&self) {
        if self.enabled {
            self.rate_limit_rejections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_rebuild(&self) {
        if self.enabled {
            self.cache_rebuilds.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_coordinator_ack(&self, ok: bool) {
        if !self.enabled {
            return;
        }
        if ok {
            self.coordinator_acks_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.coordinator_acks_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Whether the configured detail level is `detailed` (reserved for
    /// counters the basic level intentionally omits, e.g. per-endpoint
    /// latency histograms a future revision might add).
    #[must_use]
    pub fn is_detailed(&self) -> bool {
        self.detail == MetricsDetailLevel::Detailed
    }

    /// A point-in-time snapshot, useful for tests and status endpoints.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            v1_basic_queries: self.v1_basic_queries.load(Ordering::Relaxed),
            v1_full_queries: self.v1_full_queries.load(Ordering::Relaxed),
            v2_challenge_queries: self.v2_challenge_queries.load(Ordering::Relaxed),
            v2_basic_queries: self.v2_basic_queries.load(Ordering::Relaxed),
            v2_players_queries: self.v2_players_queries.load(Ordering::Relaxed),
            rate_limit_rejections: self.rate_limit_rejections.load(Ordering::Relaxed),
            cache_rebuilds: self.cache_rebuilds.load(Ordering::Relaxed),
            coordinator_acks_ok: self.coordinator_acks_ok.load(Ordering::Relaxed),
            coordinator_acks_rejected: self.coordinator_acks_rejected.load(Ordering::Relaxed),
        }
    }
}

/// A read-only copy of [`Metrics`]' counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub v1_basic_queries: u64,
    pub v1_full_queries: u64,
    pub v2_challenge_queries: u64,
    pub v2_basic_queries: u64,
    pub v2_players_queries: u64,
    pub rate_limit_rejections: u64,
    pub cache_rebuilds: u64,
    pub coordinator_acks_ok: u64,
    pub coordinator_acks_rejected: u64,
}
