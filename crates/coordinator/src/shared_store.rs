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

//! The shared-store backed coordinator: workers publish JSON snapshots to a
//! keyed index in an external store, primaries read, evict stale entries,
//! and aggregate.
//!
//! [`SharedStore`] is deliberately narrow: no driver types leak past it, so
//! the publisher and reader below can drive any key-value-plus-sorted-index
//! store, not just Redis. [`RedisStore`] is the one real implementation,
//! built as a thin wrapper around `redis::aio::ConnectionManager`.

use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use hyquery_core::Clock;
use hyquery_network::ExponentialBackoff;
use hyquery_protocol::{PlayerEntry, RemoteServerEntry, RemoteServerStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::aggregation::{Aggregate, CoordinatorError, FleetCoordinator};

/// Failure talking to the shared store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The initial connection or health probe failed.
    #[error("failed to connect to the shared store: {0}")]
    Connect(String),
    /// A command against an already-open connection failed.
    #[error("shared store command failed: {0}")]
    Command(String),
    /// A stored value was not the JSON shape a snapshot expects.
    #[error("malformed snapshot JSON for server '{0}': {1}")]
    MalformedSnapshot(String, String),
}

/// The narrow key-value-plus-sorted-index interface the shared-store
/// coordinator is built against. No Redis types appear in this signature.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Succeeds only if the store responds to a health probe.
    async fn connect_and_validate(&self) -> Result<(), StoreError>;

    /// Atomically sets `server_key` to `json` with the given TTL and upserts
    /// `server_id` into `index_key`'s sorted index with score `updated_at_millis`.
    async fn publish_snapshot(
        &self,
        server_key: &str,
        index_key: &str,
        ttl_seconds: u64,
        updated_at_millis: i64,
        server_id: &str,
        json: &str,
    ) -> Result<(), StoreError>;

    /// Removes index entries with score `<= cutoff_millis`, returning the count removed.
    async fn evict_stale_servers(&self, index_key: &str, cutoff_millis: i64) -> Result<u64, StoreError>;

    /// Returns index entries with score `>= cutoff_millis`.
    async fn get_active_server_ids(&self, index_key: &str, cutoff_millis: i64) -> Result<Vec<String>, StoreError>;

    /// Batched multi-get; each position is `None` if the key was absent (e.g. expired).
    async fn get_snapshots(&self, server_keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    /// Releases any resources held by the connection.
    async fn close(&self);
}

/// A Redis-backed [`SharedStore`], built on `redis::aio::ConnectionManager`:
/// one shared, auto-reconnecting handle behind a `tokio::sync::Mutex`, since
/// the manager's own reconnection logic assumes single-flight command
/// issuance per logical caller.
pub struct RedisStore {
    connection: Mutex<redis::aio::ConnectionManager>,
}

impl RedisStore {
    /// Opens a connection manager against `redis_url` (already containing
    /// any credentials/TLS scheme the caller assembled).
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed or the initial
    /// connection cannot be established.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(|e| StoreError::Connect(e.to_string()))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn connect_and_validate(&self) -> Result<(), StoreError> {
        let mut con = self.connection.lock().await;
        redis::cmd("PING")
            .query_async::<String>(&mut *con)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(())
    }

    async fn publish_snapshot(
        &self,
        server_key: &str,
        index_key: &str,
        ttl_seconds: u64,
        updated_at_millis: i64,
        server_id: &str,
        json: &str,
    ) -> Result<(), StoreError> {
        let mut con = self.connection.lock().await;
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(server_key)
            .arg(json)
            .arg("EX")
            .arg(ttl_seconds)
            .ignore()
            .cmd("ZADD")
            .arg(index_key)
            .arg(updated_at_millis)
            .arg(server_id)
            .ignore()
            .query_async::<()>(&mut *con)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }

    async fn evict_stale_servers(&self, index_key: &str, cutoff_millis: i64) -> Result<u64, StoreError> {
        let mut con = self.connection.lock().await;
        let removed: u64 = redis::cmd("ZREMRANGEBYSCORE")
            .arg(index_key)
            .arg("-inf")
            .arg(cutoff_millis)
            .query_async(&mut *con)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(removed)
    }

    async fn get_active_server_ids(&self, index_key: &str, cutoff_millis: i64) -> Result<Vec<String>, StoreError> {
        let mut con = self.connection.lock().await;
        let ids: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(index_key)
            .arg(cutoff_millis)
            .arg("+inf")
            .query_async(&mut *con)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(ids)
    }

    async fn get_snapshots(&self, server_keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        if server_keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut con = self.connection.lock().await;
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(server_keys)
            .query_async(&mut *con)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(values)
    }

    async fn close(&self) {
        // `ConnectionManager` has no explicit close; dropping it tears down
        // the underlying multiplexed connection.
    }
}

/// Builds the keys a given namespace's snapshot and index live under.
#[must_use]
pub fn server_key(namespace: &str, server_id: &str) -> String {
    format!("hyquery:{{{namespace}}}:server:{server_id}")
}

/// See [`server_key`].
#[must_use]
pub fn index_key(namespace: &str) -> String {
    format!("hyquery:{{{namespace}}}:index")
}

/// The self-contained JSON document a worker publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    pub id: String,
    pub name: String,
    pub motd: String,
    pub online: u32,
    pub max: u32,
    pub port: u32,
    pub version: String,
    pub players: Vec<SnapshotPlayer>,
    pub updated_at_millis: i64,
}

/// A player entry as it appears inside a [`RemoteSnapshot`]'s JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPlayer {
    pub username: String,
    pub uuid: uuid::Uuid,
}

impl From<&PlayerEntry> for SnapshotPlayer {
    fn from(p: &PlayerEntry) -> Self {
        Self {
            username: p.username.clone(),
            uuid: p.uuid,
        }
    }
}

impl RemoteSnapshot {
    fn into_remote_server_entry(self) -> RemoteServerEntry {
        RemoteServerEntry {
            id: self.id.clone(),
            name: self.name,
            motd: self.motd,
            online: self.online,
            max: self.max,
            status: RemoteServerStatus::Online,
            updated_at_millis: self.updated_at_millis,
            players: self
                .players
                .into_iter()
                .map(|p| PlayerEntry {
                    username: p.username,
                    uuid: p.uuid,
                    source_server_id: Some(self.id.clone()),
                })
                .collect(),
        }
    }
}

/// Worker-side config for the shared-store publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub namespace: String,
    pub server_id: String,
    pub publish_interval: Duration,
    pub stale_after: Duration,
}

impl PublisherConfig {
    fn ttl_seconds(&self) -> u64 {
        let stale_twice = self.stale_after.as_secs() * 2;
        let interval_thrice = self.publish_interval.as_secs() * 3;
        stale_twice.max(interval_thrice).max(1)
    }
}

/// Publishes this worker's snapshot to the shared store on a schedule,
/// applying exponential backoff on failure.
pub struct SharedStorePublisher {
    store: Arc<dyn SharedStore>,
    config: PublisherConfig,
    clock: Arc<dyn Clock>,
    backoff: Mutex<ExponentialBackoff>,
    next_attempt_monotonic_nanos: AtomicI64,
}

impl SharedStorePublisher {
    /// Builds a publisher for `config.server_id` against `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, config: PublisherConfig, clock: Arc<dyn Clock>) -> Self {
        let backoff = ExponentialBackoff::new(config.publish_interval, Duration::from_secs(60), 2.0, 0, false)
            .expect("publish interval and 60s max form a valid backoff range");
        Self {
            store,
            config,
            clock,
            backoff: Mutex::new(backoff),
            next_attempt_monotonic_nanos: AtomicI64::new(0),
        }
    }

    /// Whether a tick at the current instant should actually attempt a
    /// publish, honoring any pending backoff delay from a prior failure.
    #[must_use]
    pub fn should_attempt_now(&self) -> bool {
        let now = self.clock.monotonic_nanos().0 as i64;
        now >= self.next_attempt_monotonic_nanos.load(Ordering::SeqCst)
    }

    /// Publishes one snapshot built from `name`/`motd`/counts/`players`.
    ///
    /// On failure, schedules the next attempt using the backoff sequence
    /// (doubling up to 60s) instead of terminating the publisher. On the
    /// first success after any failures, the backoff sequence resets.
    pub async fn publish_once(
        &self,
        name: impl Into<String>,
        motd: impl Into<String>,
        online: u32,
        max: u32,
        port: u32,
        version: impl Into<String>,
        players: Vec<PlayerEntry>,
    ) -> Result<(), StoreError> {
        let updated_at_millis = self.clock.unix_millis().as_i64();
        let snapshot = RemoteSnapshot {
            id: self.config.server_id.clone(),
            name: name.into(),
            motd: motd.into(),
            online,
            max,
            port,
            version: version.into(),
            players: players.iter().map(SnapshotPlayer::from).collect(),
            updated_at_millis,
        };
        let json = serde_json::to_string(&snapshot).expect("RemoteSnapshot always serializes");

        let server_key = server_key(&self.config.namespace, &self.config.server_id);
        let index_key = index_key(&self.config.namespace);
        let ttl = self.config.ttl_seconds();

        let result = self
            .store
            .publish_snapshot(&server_key, &index_key, ttl, updated_at_millis, &self.config.server_id, &json)
            .await;

        let mut backoff = self.backoff.lock().await;
        match &result {
            Ok(()) => {
                backoff.reset();
                self.next_attempt_monotonic_nanos.store(0, Ordering::SeqCst);
            }
            Err(_) => {
                let delay = backoff.next_duration();
                let now = self.clock.monotonic_nanos().0 as i64;
                self.next_attempt_monotonic_nanos
                    .store(now + delay.as_nanos() as i64, Ordering::SeqCst);
            }
        }
        result
    }
}

/// Primary-side reader: evicts stale entries, reads active snapshots across
/// one or more namespaces, and caches the resulting aggregate for 1 second.
pub struct SharedStoreCoordinator {
    store: Arc<dyn SharedStore>,
    namespaces: Vec<String>,
    stale_after: Duration,
    clock: Arc<dyn Clock>,
    cache: Mutex<Option<CachedAggregate>>,
}

struct CachedAggregate {
    aggregate: Aggregate,
    includes_players: bool,
    built_at: hyquery_core::MonotonicNanos,
}

const AGGREGATE_CACHE_TTL: Duration = Duration::from_secs(1);

impl SharedStoreCoordinator {
    /// Builds a reader over `namespaces` (the configured one, plus `"global"`
    /// when `includeGlobalNamespace` is set), treating any snapshot older
    /// than `stale_after` as absent.
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, namespaces: Vec<String>, stale_after: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            namespaces,
            stale_after,
            clock,
            cache: Mutex::new(None),
        }
    }

    async fn build_aggregate(&self, include_players: bool) -> Result<Aggregate, CoordinatorError> {
        let now = self.clock.unix_millis().as_i64();
        let cutoff = now - (self.stale_after.as_secs() as i64 * 1000);

        let mut by_id: std::collections::HashMap<String, RemoteSnapshot> = std::collections::HashMap::new();

        for namespace in &self.namespaces {
            let idx_key = index_key(namespace);

            self.store
                .evict_stale_servers(&idx_key, cutoff)
                .await
                .map_err(|e| CoordinatorError::StoreUnavailable(e.to_string()))?;

            let active_ids = self
                .store
                .get_active_server_ids(&idx_key, cutoff)
                .await
                .map_err(|e| CoordinatorError::StoreUnavailable(e.to_string()))?;

            if active_ids.is_empty() {
                continue;
            }

            let keys: Vec<String> = active_ids.iter().map(|id| server_key(namespace, id)).collect();
            let values = self
                .store
                .get_snapshots(&keys)
                .await
                .map_err(|e| CoordinatorError::StoreUnavailable(e.to_string()))?;

            for value in values.into_iter().flatten() {
                let snapshot: RemoteSnapshot = match serde_json::from_str(&value) {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                if snapshot.updated_at_millis <= cutoff {
                    continue;
                }
                by_id
                    .entry(snapshot.id.clone())
                    .and_modify(|existing| {
                        if snapshot.updated_at_millis > existing.updated_at_millis {
                            *existing = snapshot.clone();
                        }
                    })
                    .or_insert(snapshot);
            }
        }

        let mut snapshots: Vec<RemoteSnapshot> = by_id.into_values().collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));

        let total_online = snapshots.iter().map(|s| s.online).sum();
        let total_max = snapshots.iter().map(|s| s.max).sum();
        let remote_servers: Vec<RemoteServerEntry> = snapshots
            .iter()
            .cloned()
            .map(RemoteSnapshot::into_remote_server_entry)
            .collect();
        let network_players = if include_players {
            remote_servers.iter().flat_map(|s| s.players.clone()).collect()
        } else {
            Vec::new()
        };

        Ok(Aggregate {
            total_online,
            total_max,
            remote_servers,
            network_players,
        })
    }
}

#[async_trait]
impl FleetCoordinator for SharedStoreCoordinator {
    async fn get_aggregate(&self, include_players: bool) -> Result<Aggregate, CoordinatorError> {
        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.as_ref() {
                let age = self.clock.monotonic_nanos().since(cached.built_at);
                let shape_matches = cached.includes_players || !include_players;
                if age < AGGREGATE_CACHE_TTL && shape_matches {
                    return Ok(cached.aggregate.clone());
                }
            }
        }

        let aggregate = self.build_aggregate(include_players).await?;

        let mut cache = self.cache.lock().await;
        *cache = Some(CachedAggregate {
            aggregate: aggregate.clone(),
            includes_players: include_players,
            built_at: self.clock.monotonic_nanos(),
        });
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex as StdMutex};

    use hyquery_core::StaticClock;
    use uuid::Uuid;

    use super::*;

    /// An in-memory [`SharedStore`] fake, modeling Redis's sorted-set +
    /// string semantics closely enough to drive the coordinator's logic
    /// without a real server.
    #[derive(Default)]
    struct FakeStore {
        strings: StdMutex<HashMap<String, String>>,
        sorted_sets: StdMutex<HashMap<String, HashMap<String, i64>>>,
        fail_next: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl SharedStore for FakeStore {
        async fn connect_and_validate(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn publish_snapshot(
            &self,
            server_key: &str,
            index_key: &str,
            _ttl_seconds: u64,
            updated_at_millis: i64,
            server_id: &str,
            json: &str,
        ) -> Result<(), StoreError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Command("simulated failure".into()));
            }
            self.strings.lock().unwrap().insert(server_key.to_string(), json.to_string());
            self.sorted_sets
                .lock()
                .unwrap()
                .entry(index_key.to_string())
                .or_default()
                .insert(server_id.to_string(), updated_at_millis);
            Ok(())
        }

        async fn evict_stale_servers(&self, index_key: &str, cutoff_millis: i64) -> Result<u64, StoreError> {
            let mut sets = self.sorted_sets.lock().unwrap();
            let Some(set) = sets.get_mut(index_key) else {
                return Ok(0);
            };
            let before = set.len();
            set.retain(|_, score| *score > cutoff_millis);
            Ok((before - set.len()) as u64)
        }

        async fn get_active_server_ids(&self, index_key: &str, cutoff_millis: i64) -> Result<Vec<String>, StoreError> {
            let sets = self.sorted_sets.lock().unwrap();
            Ok(sets
                .get(index_key)
                .map(|set| {
                    set.iter()
                        .filter(|(_, score)| **score >= cutoff_millis)
                        .map(|(id, _)| id.clone())
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn get_snapshots(&self, server_keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
            let strings = self.strings.lock().unwrap();
            Ok(server_keys.iter().map(|k| strings.get(k).cloned()).collect())
        }

        async fn close(&self) {}
    }

    fn player(name: &str, id: u128) -> PlayerEntry {
        PlayerEntry::local(name, Uuid::from_u128(id))
    }

    #[tokio::test]
    async fn publish_then_aggregate_reflects_the_published_snapshot() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let store = Arc::new(FakeStore::default());

        let publisher = SharedStorePublisher::new(
            store.clone(),
            PublisherConfig {
                namespace: "default".into(),
                server_id: "lobby-1".into(),
                publish_interval: Duration::from_secs(10),
                stale_after: Duration::from_secs(30),
            },
            clock.clone(),
        );
        publisher
            .publish_once("Lobby", "hi", 2, 50, 25565, "1.0", vec![player("alice", 1)])
            .await
            .unwrap();

        let coordinator = SharedStoreCoordinator::new(store, vec!["default".into()], Duration::from_secs(30), clock);
        let aggregate = coordinator.get_aggregate(true).await.unwrap();
        assert_eq!(aggregate.total_online, 2);
        assert_eq!(aggregate.total_max, 50);
        assert_eq!(aggregate.remote_servers.len(), 1);
        assert_eq!(aggregate.remote_servers[0].id, "lobby-1");
        assert_eq!(aggregate.network_players.len(), 1);
        assert_eq!(aggregate.network_players[0].source_server_id.as_deref(), Some("lobby-1"));
    }

    /// Staleness filtering and serverId-ascending sort.
    #[tokio::test]
    async fn excludes_stale_snapshots_and_sorts_by_server_id() {
        let clock = Arc::new(StaticClock::at(1_700_000_010_000));
        let store = Arc::new(FakeStore::default());
        let namespace = "default".to_string();

        for (id, age_ms, online, max) in [("server-c", 3_000, 1, 10), ("server-a", 9_000, 2, 20), ("server-b", 11_000, 3, 30)] {
            let snapshot = RemoteSnapshot {
                id: id.to_string(),
                name: id.to_string(),
                motd: String::new(),
                online,
                max,
                port: 25565,
                version: "1.0".into(),
                players: vec![],
                updated_at_millis: clock.unix_millis().as_i64() - age_ms,
            };
            let json = serde_json::to_string(&snapshot).unwrap();
            store
                .publish_snapshot(
                    &server_key(&namespace, id),
                    &index_key(&namespace),
                    60,
                    snapshot.updated_at_millis,
                    id,
                    &json,
                )
                .await
                .unwrap();
        }

        let coordinator = SharedStoreCoordinator::new(store, vec![namespace], Duration::from_secs(10), clock);
        let aggregate = coordinator.get_aggregate(false).await.unwrap();

        assert_eq!(aggregate.remote_servers.len(), 2);
        assert_eq!(aggregate.remote_servers[0].id, "server-a");
        assert_eq!(aggregate.remote_servers[1].id, "server-c");
        assert_eq!(aggregate.total_online, 3);
        assert_eq!(aggregate.total_max, 30);
    }

    #[tokio::test]
    async fn aggregate_is_cached_for_one_second() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let store = Arc::new(FakeStore::default());
        let namespace = "default".to_string();
        let snapshot = RemoteSnapshot {
            id: "lobby-1".into(),
            name: "Lobby".into(),
            motd: String::new(),
            online: 1,
            max: 10,
            port: 25565,
            version: "1.0".into(),
            players: vec![],
            updated_at_millis: clock.unix_millis().as_i64(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        store
            .publish_snapshot(&server_key(&namespace, "lobby-1"), &index_key(&namespace), 60, snapshot.updated_at_millis, "lobby-1", &json)
            .await
            .unwrap();

        let coordinator = SharedStoreCoordinator::new(store.clone(), vec![namespace.clone()], Duration::from_secs(30), clock.clone());
        let first = coordinator.get_aggregate(false).await.unwrap();
        assert_eq!(first.total_online, 1);

        // Mutate the store directly; the cached aggregate should not see it yet.
        store.sorted_sets.lock().unwrap().get_mut(&index_key(&namespace)).unwrap().remove("lobby-1");
        let still_cached = coordinator.get_aggregate(false).await.unwrap();
        assert_eq!(still_cached.total_online, 1);

        clock.advance(Duration::from_millis(1_100));
        let refreshed = coordinator.get_aggregate(false).await.unwrap();
        assert_eq!(refreshed.total_online, 0);
    }

    #[tokio::test]
    async fn publisher_backoff_delays_the_next_attempt_after_a_failure() {
        let clock = Arc::new(StaticClock::at(0));
        let store = Arc::new(FakeStore::default());
        store.fail_next.store(true, Ordering::SeqCst);

        let publisher = SharedStorePublisher::new(
            store,
            PublisherConfig {
                namespace: "default".into(),
                server_id: "lobby-1".into(),
                publish_interval: Duration::from_secs(5),
                stale_after: Duration::from_secs(30),
            },
            clock.clone(),
        );

        assert!(publisher.should_attempt_now());
        let result = publisher.publish_once("n", "m", 0, 0, 25565, "1.0", vec![]).await;
        assert!(result.is_err());
        assert!(!publisher.should_attempt_now());

        clock.advance(Duration::from_secs(6));
        assert!(publisher.should_attempt_now());
    }

    #[test]
    fn ttl_is_the_larger_of_twice_stale_after_and_thrice_publish_interval() {
        let config = PublisherConfig {
            namespace: "default".into(),
            server_id: "lobby-1".into(),
            publish_interval: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
        };
        assert_eq!(config.ttl_seconds(), 60);

        let config = PublisherConfig {
            namespace: "default".into(),
            server_id: "lobby-1".into(),
            publish_interval: Duration::from_secs(30),
            stale_after: Duration::from_secs(10),
        };
        assert_eq!(config.ttl_seconds(), 90);
    }
}
