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

//! The UDP fleet coordinator: a worker signs and pushes its status to a
//! primary over the shared game-server socket; the primary verifies,
//! records it, and replies with a signed ACK.
//!
//! Both sides are pure request/response logic here -- neither owns a
//! socket. The server crate's dispatch loop reads datagrams, hands the
//! bytes to [`PrimaryCoordinator::process_status_frame`] or
//! [`WorkerPublisher::build_status_frame`], and writes whatever bytes come
//! back.

use std::{
    sync::{atomic::{AtomicU64, Ordering}, Arc},
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use hyquery_core::Clock;
use hyquery_cryptography::HmacKey;
use hyquery_protocol::{
    AckStatus, PlayerEntry, RemoteServerEntry, RemoteServerStatus, StatusAck, StatusPayload,
    StatusUpdate, StatusVerifyError,
};

use crate::aggregation::{Aggregate, CoordinatorError, FleetCoordinator};

/// One entry in the primary's worker registry: an id (or `prefix*`
/// wildcard pattern) mapped to the HMAC key that worker signs with.
#[derive(Debug, Clone)]
pub struct WorkerEntry {
    /// A literal worker id, or a pattern ending in `*` matching any id with that prefix.
    pub id_pattern: String,
    /// The key this worker (or every worker the pattern matches) signs with.
    pub key: HmacKey,
}

fn pattern_matches(pattern: &str, id: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => id.starts_with(prefix),
        None => pattern == id,
    }
}

/// The primary's configured set of recognized workers.
///
/// Entries are tried in configuration order; the first match (literal or
/// wildcard) wins.
#[derive(Debug, Clone)]
pub struct WorkerRegistry {
    entries: Vec<WorkerEntry>,
}

impl WorkerRegistry {
    /// Builds a registry from an ordered list of entries.
    #[must_use]
    pub fn new(entries: Vec<WorkerEntry>) -> Self {
        Self { entries }
    }

    fn match_entry(&self, worker_id: &str) -> Option<&WorkerEntry> {
        self.entries.iter().find(|e| pattern_matches(&e.id_pattern, worker_id))
    }

    /// The key every ACK is signed with, regardless of which worker it
    /// answers: the first configured entry's key.
    ///
    /// This is a carried-over limitation, not introduced here -- a worker
    /// registry with more than one distinct signing key means only the
    /// first entry's workers can ever validate an ACK's signature. It is
    /// not fixed in this implementation; see the crate root docs.
    fn ack_signing_key(&self) -> Option<&HmacKey> {
        self.entries.first().map(|e| &e.key)
    }
}

/// Accepts and records `HYSTATUS` frames, producing signed `HYSTATOK` replies.
pub struct PrimaryCoordinator {
    registry: WorkerRegistry,
    clock: Arc<dyn Clock>,
    max_clock_skew: Duration,
    fleet: DashMap<String, RemoteServerEntry>,
    generation: AtomicU64,
}

impl PrimaryCoordinator {
    /// Builds a coordinator accepting updates from `registry`'s workers,
    /// rejecting any whose embedded timestamp drifts from now by more than
    /// `max_clock_skew`.
    #[must_use]
    pub fn new(registry: WorkerRegistry, clock: Arc<dyn Clock>, max_clock_skew: Duration) -> Self {
        Self {
            registry,
            clock,
            max_clock_skew,
            fleet: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Monotonically increasing counter bumped once per accepted (`AckStatus::Ok`)
    /// status update. Callers that cache responses derived from the fleet
    /// (the server crate's response cache, spec §4.7 step 5) compare this
    /// before/after `process_status_frame` to decide whether to invalidate.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Processes one inbound `HYSTATUS` frame, returning the signed
    /// `HYSTATOK` bytes to send back. Only returns `None` when no worker is
    /// configured at all (so there's no key to sign an ACK with); any
    /// parse failure of the frame itself -- an unreadable worker id, a bad
    /// HMAC, a truncated payload -- still gets a signed `BAD_HMAC` ACK, per
    /// spec §4.7 step 1.
    pub fn process_status_frame(&self, raw: &[u8]) -> Option<bytes::BytesMut> {
        let ack_key = self.registry.ack_signing_key()?;
        let claimed_timestamp = StatusUpdate::peek_timestamp_millis(raw).unwrap_or(0);

        let worker_id = match StatusUpdate::peek_worker_id(raw) {
            Ok(id) => id,
            Err(_) => {
                return Some(
                    StatusAck {
                        status: AckStatus::BadHmac,
                        timestamp_millis: claimed_timestamp,
                    }
                    .encode_signed(ack_key),
                );
            }
        };

        let status = match self.registry.match_entry(&worker_id) {
            None => AckStatus::UnknownId,
            Some(entry) => match StatusUpdate::decode_and_verify(raw, &entry.key) {
                Err(StatusVerifyError::BadHmac) => AckStatus::BadHmac,
                Err(StatusVerifyError::Wire(_)) => AckStatus::BadHmac,
                Ok(update) => {
                    let now = self.clock.unix_millis().as_i64();
                    let skew_ms = self.max_clock_skew.as_millis() as i64;
                    if (now - update.timestamp_millis).abs() > skew_ms {
                        AckStatus::Stale
                    } else {
                        self.record(&worker_id, update.timestamp_millis, update.payload);
                        AckStatus::Ok
                    }
                }
            },
        };

        Some(
            StatusAck {
                status,
                timestamp_millis: claimed_timestamp,
            }
            .encode_signed(ack_key),
        )
    }

    fn record(&self, worker_id: &str, timestamp_millis: i64, payload: StatusPayload) {
        let players = payload
            .players
            .into_iter()
            .map(|p| PlayerEntry {
                source_server_id: Some(worker_id.to_string()),
                ..p
            })
            .collect();

        self.fleet.insert(
            worker_id.to_string(),
            RemoteServerEntry {
                id: worker_id.to_string(),
                name: payload.name,
                motd: payload.motd,
                online: payload.online,
                max: payload.max,
                status: RemoteServerStatus::Online,
                updated_at_millis: timestamp_millis,
                players,
            },
        );
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns every fleet member whose last update is within `staleness_threshold` of now.
    #[must_use]
    pub fn fleet_snapshot(&self, staleness_threshold: Duration) -> Vec<RemoteServerEntry> {
        let now = self.clock.unix_millis().as_i64();
        let threshold_ms = staleness_threshold.as_millis() as i64;
        self.fleet
            .iter()
            .filter(|entry| (now - entry.updated_at_millis) <= threshold_ms)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

/// Adapts a [`PrimaryCoordinator`] to [`FleetCoordinator`], fixing the
/// worker-timeout threshold used to decide which fleet members are fresh
/// enough to serve in an aggregate.
pub struct UdpFleetCoordinator {
    primary: Arc<PrimaryCoordinator>,
    worker_timeout: Duration,
}

impl UdpFleetCoordinator {
    /// Wraps `primary`, filtering its fleet snapshot to entries updated
    /// within `worker_timeout` of now.
    #[must_use]
    pub fn new(primary: Arc<PrimaryCoordinator>, worker_timeout: Duration) -> Self {
        Self {
            primary,
            worker_timeout,
        }
    }
}

#[async_trait]
impl FleetCoordinator for UdpFleetCoordinator {
    async fn get_aggregate(&self, include_players: bool) -> Result<Aggregate, CoordinatorError> {
        let fresh = self.primary.fleet_snapshot(self.worker_timeout);

        let total_online = fresh.iter().map(|s| s.online).sum();
        let total_max = fresh.iter().map(|s| s.max).sum();
        let network_players = if include_players {
            fresh.iter().flat_map(|s| s.players.clone()).collect()
        } else {
            Vec::new()
        };

        Ok(Aggregate {
            total_online,
            total_max,
            remote_servers: fresh,
            network_players,
        })
    }
}

/// Builds and signs outbound `HYSTATUS` frames for one worker.
pub struct WorkerPublisher {
    worker_id: String,
    key: HmacKey,
    clock: Arc<dyn Clock>,
}

impl WorkerPublisher {
    /// Builds a publisher signing with `key` under `worker_id`.
    #[must_use]
    pub fn new(worker_id: impl Into<String>, key: HmacKey, clock: Arc<dyn Clock>) -> Self {
        Self {
            worker_id: worker_id.into(),
            key,
            clock,
        }
    }

    /// Builds and signs a status frame for the current instant, ready to send.
    #[must_use]
    pub fn build_status_frame(
        &self,
        name: impl Into<String>,
        motd: impl Into<String>,
        online: u32,
        max: u32,
        players: Vec<PlayerEntry>,
    ) -> bytes::BytesMut {
        let update = StatusUpdate {
            timestamp_millis: self.clock.unix_millis().as_i64(),
            payload: StatusPayload {
                worker_id: self.worker_id.clone(),
                name: name.into(),
                motd: motd.into(),
                online,
                max,
                players,
            },
        };
        update.encode_signed(&self.key)
    }

    /// Verifies an inbound `HYSTATOK` frame came from `primary_key` and
    /// returns its disposition.
    pub fn verify_ack(&self, raw: &[u8], primary_key: &HmacKey) -> Result<AckStatus, StatusVerifyError> {
        StatusAck::decode_and_verify(raw, primary_key).map(|ack| ack.status)
    }
}

#[cfg(test)]
mod tests {
    use hyquery_core::StaticClock;
    use uuid::Uuid;

    use super::*;

    fn registry_with(entries: Vec<(&str, &[u8])>) -> WorkerRegistry {
        WorkerRegistry::new(
            entries
                .into_iter()
                .map(|(pattern, secret)| WorkerEntry {
                    id_pattern: pattern.to_string(),
                    key: HmacKey::new(secret),
                })
                .collect(),
        )
    }

    #[test]
    fn accepts_a_well_formed_status_update_and_acks_ok() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"lobby-secret")]);
        let primary = PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30));
        let publisher = WorkerPublisher::new("lobby-1", HmacKey::new(b"lobby-secret"), clock);

        let frame = publisher.build_status_frame(
            "Lobby",
            "welcome",
            1,
            50,
            vec![PlayerEntry::local("alice", Uuid::from_u128(1))],
        );

        let ack_bytes = primary.process_status_frame(&frame).unwrap();
        let ack_key = HmacKey::new(b"lobby-secret");
        let ack = StatusAck::decode_and_verify(&ack_bytes, &ack_key).unwrap();
        assert_eq!(ack.status, AckStatus::Ok);

        let snapshot = primary.fleet_snapshot(Duration::from_secs(60));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "lobby-1");
        assert_eq!(snapshot[0].players[0].source_server_id.as_deref(), Some("lobby-1"));
    }

    #[test]
    fn unregistered_worker_id_is_rejected() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"lobby-secret")]);
        let primary = PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30));
        let publisher = WorkerPublisher::new("intruder", HmacKey::new(b"whatever"), clock);

        let frame = publisher.build_status_frame("x", "y", 0, 0, vec![]);
        let ack_bytes = primary.process_status_frame(&frame).unwrap();
        let ack_key = HmacKey::new(b"lobby-secret");
        let ack = StatusAck::decode_and_verify(&ack_bytes, &ack_key).unwrap();
        assert_eq!(ack.status, AckStatus::UnknownId);
        assert!(primary.fleet_snapshot(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn wrong_key_for_a_known_worker_id_is_rejected_as_bad_hmac() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"lobby-secret")]);
        let primary = PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30));
        let impostor_publisher = WorkerPublisher::new("lobby-1", HmacKey::new(b"wrong-secret"), clock);

        let frame = impostor_publisher.build_status_frame("x", "y", 0, 0, vec![]);
        let ack_bytes = primary.process_status_frame(&frame).unwrap();
        let ack_key = HmacKey::new(b"lobby-secret");
        let ack = StatusAck::decode_and_verify(&ack_bytes, &ack_key).unwrap();
        assert_eq!(ack.status, AckStatus::BadHmac);
    }

    #[test]
    fn a_truncated_frame_still_gets_a_signed_bad_hmac_ack() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"lobby-secret")]);
        let primary = PrimaryCoordinator::new(registry, clock, Duration::from_secs(30));

        let garbage = [0xaa_u8; 3];
        let ack_bytes = primary.process_status_frame(&garbage).unwrap();
        let ack_key = HmacKey::new(b"lobby-secret");
        let ack = StatusAck::decode_and_verify(&ack_bytes, &ack_key).unwrap();
        assert_eq!(ack.status, AckStatus::BadHmac);
        assert!(primary.fleet_snapshot(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn stale_timestamp_is_rejected_but_still_acked() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"lobby-secret")]);
        let primary = PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(10));
        let publisher = WorkerPublisher::new("lobby-1", HmacKey::new(b"lobby-secret"), clock.clone());

        let frame = publisher.build_status_frame("x", "y", 0, 0, vec![]);
        clock.advance(Duration::from_secs(20));

        let ack_bytes = primary.process_status_frame(&frame).unwrap();
        let ack_key = HmacKey::new(b"lobby-secret");
        let ack = StatusAck::decode_and_verify(&ack_bytes, &ack_key).unwrap();
        assert_eq!(ack.status, AckStatus::Stale);
        assert!(primary.fleet_snapshot(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn wildcard_pattern_matches_any_id_with_that_prefix() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-*", b"shared-secret")]);
        let primary = PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30));
        let publisher = WorkerPublisher::new("lobby-42", HmacKey::new(b"shared-secret"), clock);

        let frame = publisher.build_status_frame("x", "y", 0, 0, vec![]);
        let ack_bytes = primary.process_status_frame(&frame).unwrap();
        let ack_key = HmacKey::new(b"shared-secret");
        let ack = StatusAck::decode_and_verify(&ack_bytes, &ack_key).unwrap();
        assert_eq!(ack.status, AckStatus::Ok);
    }

    /// Documents the carried-over ACK-signing quirk: a second worker entry
    /// with a different key never gets an ACK it can verify, because ACKs
    /// always sign with the first entry's key.
    #[test]
    fn second_workers_ack_does_not_verify_under_its_own_key() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"first-secret"), ("lobby-2", b"second-secret")]);
        let primary = PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30));
        let publisher = WorkerPublisher::new("lobby-2", HmacKey::new(b"second-secret"), clock);

        let frame = publisher.build_status_frame("x", "y", 0, 0, vec![]);
        let ack_bytes = primary.process_status_frame(&frame).unwrap();

        let second_workers_key = HmacKey::new(b"second-secret");
        assert!(matches!(
            StatusAck::decode_and_verify(&ack_bytes, &second_workers_key),
            Err(StatusVerifyError::BadHmac)
        ));

        let first_workers_key = HmacKey::new(b"first-secret");
        assert!(StatusAck::decode_and_verify(&ack_bytes, &first_workers_key).is_ok());
    }

    #[test]
    fn no_configured_workers_means_no_ack_is_sent() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![]);
        let primary = PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30));
        let publisher = WorkerPublisher::new("lobby-1", HmacKey::new(b"secret"), clock);

        let frame = publisher.build_status_frame("x", "y", 0, 0, vec![]);
        assert!(primary.process_status_frame(&frame).is_none());
    }

    #[tokio::test]
    async fn udp_fleet_coordinator_sums_fresh_entries_and_tags_players() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"secret"), ("lobby-2", b"secret")]);
        let primary = Arc::new(PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30)));

        let pub1 = WorkerPublisher::new("lobby-1", HmacKey::new(b"secret"), clock.clone());
        let frame1 = pub1.build_status_frame("A", "m", 2, 10, vec![PlayerEntry::local("alice", Uuid::from_u128(1))]);
        primary.process_status_frame(&frame1);

        let pub2 = WorkerPublisher::new("lobby-2", HmacKey::new(b"secret"), clock);
        let frame2 = pub2.build_status_frame("B", "m", 3, 20, vec![PlayerEntry::local("bob", Uuid::from_u128(2))]);
        primary.process_status_frame(&frame2);

        let coordinator = UdpFleetCoordinator::new(primary, Duration::from_secs(60));
        let aggregate = coordinator.get_aggregate(true).await.unwrap();
        assert_eq!(aggregate.total_online, 5);
        assert_eq!(aggregate.total_max, 30);
        assert_eq!(aggregate.remote_servers.len(), 2);
        assert_eq!(aggregate.network_players.len(), 2);
        assert!(aggregate.contributed());
    }

    #[tokio::test]
    async fn udp_fleet_coordinator_omits_players_when_not_requested() {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let registry = registry_with(vec![("lobby-1", b"secret")]);
        let primary = Arc::new(PrimaryCoordinator::new(registry, clock.clone(), Duration::from_secs(30)));
        let publisher = WorkerPublisher::new("lobby-1", HmacKey::new(b"secret"), clock);
        let frame = publisher.build_status_frame("A", "m", 1, 10, vec![PlayerEntry::local("alice", Uuid::from_u128(1))]);
        primary.process_status_frame(&frame);

        let coordinator = UdpFleetCoordinator::new(primary, Duration::from_secs(60));
        let aggregate = coordinator.get_aggregate(false).await.unwrap();
        assert!(aggregate.network_players.is_empty());
    }
}
