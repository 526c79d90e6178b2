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

//! The two-slot response cache: a "basic" slot and a "full"
//! slot, each rebuilt at most once per TTL. A slot is published via an
//! atomic pointer swap, so a hit never takes a lock at all -- only a stale
//! or empty slot pays for a mutex, which then serializes rebuilds the same
//! way the single-lock version did. The `Arc<[u8]>` handed back is
//! immutable -- the write path copies it into a fresh per-request buffer
//! rather than mutating the cached bytes.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use hyquery_core::{Clock, MonotonicNanos};
use tokio::sync::Mutex;

/// Which cached shape the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Basic,
    Full,
}

struct Slot {
    bytes: Arc<[u8]>,
    created: MonotonicNanos,
}

impl Slot {
    fn is_stale(&self, now: MonotonicNanos, ttl: std::time::Duration) -> bool {
        now.since(self.created) > ttl
    }
}

/// Per-kind state: the published slot readers load lock-free, plus a mutex
/// that only a rebuild ever touches.
#[derive(Default)]
struct SlotCell {
    published: ArcSwapOption<Slot>,
    rebuild: Mutex<()>,
}

/// Two independently-published slots, rebuilt on demand.
pub struct ResponseCache {
    ttl: std::time::Duration,
    clock: Arc<dyn Clock>,
    basic: SlotCell,
    full: SlotCell,
}

impl ResponseCache {
    /// Builds a cache with the given rebuild interval.
    #[must_use]
    pub fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            basic: SlotCell::default(),
            full: SlotCell::default(),
        }
    }

    /// Returns the cached bytes for `kind`, rebuilding via `build` if the
    /// published slot is missing or older than the TTL.
    ///
    /// A fresh slot is read with a single lock-free `load`. Only a stale or
    /// empty slot takes the per-kind rebuild mutex, and re-checks freshness
    /// once it holds the lock -- a racing reader that lost the fast path
    /// but arrived second still finds the winner's fresh slot and never
    /// calls `build` a second time.
    pub async fn get<F, Fut>(&self, kind: CacheKind, build: F) -> Arc<[u8]>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Vec<u8>>,
    {
        let cell = match kind {
            CacheKind::Basic => &self.basic,
            CacheKind::Full => &self.full,
        };

        let now = self.clock.monotonic_nanos();
        if let Some(slot) = cell.published.load_full() {
            if !slot.is_stale(now, self.ttl) {
                return slot.bytes.clone();
            }
        }

        let _guard = cell.rebuild.lock().await;
        let now = self.clock.monotonic_nanos();
        if let Some(slot) = cell.published.load_full() {
            if !slot.is_stale(now, self.ttl) {
                return slot.bytes.clone();
            }
        }

        let bytes: Arc<[u8]> = build().await.into();
        cell.published.store(Some(Arc::new(Slot { bytes: bytes.clone(), created: now })));
        bytes
    }

    /// Clears both slots, forcing the next `get` of either kind to rebuild.
    /// Used when the remote aggregate changes underneath a primary.
    pub async fn invalidate(&self) {
        self.basic.published.store(None);
        self.full.published.store(None);
    }
}
