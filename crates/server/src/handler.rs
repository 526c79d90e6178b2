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

//! The request handler: the per-datagram decision tree, wired up
//! from everything else in this crate. One [`RequestHandler`] is built once
//! at startup and shared across every inbound datagram.
//!
//! V1 and V2 are handled by separate entry points since the demultiplexer
//! already told the caller which family a datagram belongs to; neither
//! entry point re-derives that classification.

use std::{net::SocketAddr, sync::Arc};

use bytes::BytesMut;
use hyquery_coordinator::Aggregate;
use hyquery_network::{ChallengeService, RateLimiter};
use hyquery_protocol::{
    encode_challenge_response, paginate_players, PlayerEntry, QueryRequest, RequestKind,
    ResponseFlags, ResponsePayload, ServerInfo, V1FullFields, V1Kind, V1Request, V1Response,
    V2Family, V2Request, V2Response,
};

use crate::{
    aggregation::AggregationView,
    cache::{CacheKind, ResponseCache},
    config::{AuthenticationConfig, EndpointPermissions, HyQueryConfig, Role},
    host::Host,
    metrics::Metrics,
};

/// The numeric protocol version this handler speaks, echoed in every
/// `SERVER_INFO` reply.
pub const PROTOCOL_VERSION: i32 = 1;

/// Which V2 endpoint a request targets, once an unrecognized type byte has
/// already been folded into `Basic` above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Basic,
    Players,
}

impl Endpoint {
    fn allowed_by(self, perm: &EndpointPermissions) -> bool {
        match self {
            Self::Basic => perm.basic,
            Self::Players => perm.players,
        }
    }
}

/// Answers V1 and V2 datagrams the demultiplexer has already classified as
/// belonging to this server, consulting the rate limiter, challenge
/// service, response cache, and aggregation view along the way.
pub struct RequestHandler {
    host: Arc<dyn Host>,
    aggregation: Arc<AggregationView>,
    rate_limiter: Arc<RateLimiter>,
    cache: Option<Arc<ResponseCache>>,
    challenge: Option<ChallengeService>,
    metrics: Arc<Metrics>,

    v1_enabled: bool,
    v2_enabled: bool,
    show_player_list: bool,
    show_plugins: bool,
    motd_override: Option<String>,
    authentication: AuthenticationConfig,
    is_primary: bool,
    protocol_hash: String,
}

impl RequestHandler {
    /// Builds a handler from a loaded config and its already-constructed
    /// collaborators. `challenge` is `None` only when `v2Enabled` is false;
    /// `cache` is `None` only when `cacheEnabled` is false.
    #[must_use]
    pub fn new(
        config: &HyQueryConfig,
        host: Arc<dyn Host>,
        aggregation: Arc<AggregationView>,
        rate_limiter: Arc<RateLimiter>,
        cache: Option<Arc<ResponseCache>>,
        challenge: Option<ChallengeService>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let is_primary = config.network.enabled && config.network.role == Role::Primary;
        Self {
            host,
            aggregation,
            rate_limiter,
            cache,
            challenge,
            metrics,
            v1_enabled: config.v1_enabled,
            v2_enabled: config.v2_enabled,
            show_player_list: config.show_player_list,
            show_plugins: config.show_plugins,
            motd_override: config.use_custom_motd.then(|| config.custom_motd.clone()),
            authentication: config.authentication.clone(),
            is_primary,
            protocol_hash: format!("hyquery/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Clears the response cache, if one is configured. Called after the
    /// primary accepts a worker status update (spec §4.7 step 5): a stale
    /// V1/V2 cached reply must not keep serving pre-update counts for up to
    /// a full `cacheTtlSeconds`.
    pub async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate().await;
        }
    }

    fn effective_motd(&self) -> String {
        self.motd_override.clone().unwrap_or_else(|| self.host.motd())
    }

    fn is_authorized(&self, endpoint: Endpoint, auth_token: Option<&str>) -> bool {
        if endpoint.allowed_by(&self.authentication.public_access) {
            return true;
        }
        auth_token
            .and_then(|token| self.authentication.tokens.get(token))
            .is_some_and(|perm| endpoint.allowed_by(perm))
    }

    /// Handles one datagram already classified as a V2 request on `family`.
    /// Returns the reply bytes to send back to `source`, or `None` if the
    /// datagram should be dropped silently (malformed, rate-limited, or
    /// token verification failed).
    pub async fn handle_v2_datagram(&self, family: V2Family, raw: &[u8], source: SocketAddr) -> Option<BytesMut> {
        if !self.v2_enabled {
            return None;
        }
        let challenge = self.challenge.as_ref()?;
        let request = V2Request::decode(raw, family).ok()?;

        match request {
            V2Request::Challenge { family } => {
                if !self.rate_limiter.check(source.ip()) {
                    self.metrics.record_rate_limit_rejection();
                    return None;
                }
                self.metrics.record_v2_challenge();
                Some(encode_challenge_response(family, challenge.mint(source)))
            }
            V2Request::Query(query) => self.handle_v2_query(family, query, source, challenge).await,
        }
    }

    async fn handle_v2_query(
        &self,
        family: V2Family,
        query: QueryRequest,
        source: SocketAddr,
        challenge: &ChallengeService,
    ) -> Option<BytesMut> {
        if !self.rate_limiter.check(source.ip()) {
            self.metrics.record_rate_limit_rejection();
            return None;
        }
        if !challenge.verify(&query.token, source) {
            return None;
        }

        let endpoint = match query.kind {
            RequestKind::Players => Endpoint::Players,
            _ => Endpoint::Basic,
        };

        if !self.is_authorized(endpoint, query.auth_token.as_deref()) {
            let mut response = self.build_v2_basic(family, &query).await?;
            response.flags = response.flags.with(ResponseFlags::AUTH_REQUIRED);
            return Some(response.encode());
        }

        let response = match endpoint {
            Endpoint::Basic => {
                self.metrics.record_v2_basic();
                self.build_v2_basic(family, &query).await?
            }
            Endpoint::Players => {
                self.metrics.record_v2_players();
                self.build_v2_players(family, &query).await?
            }
        };
        Some(response.encode())
    }

    async fn build_v2_basic(&self, family: V2Family, query: &QueryRequest) -> Option<V2Response> {
        let local_online = self.host.players().len() as i32;
        let local_max = self.host.max_players() as i32;

        let (online, max, is_network) = if self.is_primary {
            let aggregate = self.aggregation.get_aggregate(false).await.ok()?;
            (
                local_online + aggregate.total_online as i32,
                local_max + aggregate.total_max as i32,
                aggregate.contributed(),
            )
        } else {
            (local_online, local_max, false)
        };

        let address = if query.wants_address() {
            self.host.public_address()
        } else {
            None
        };

        let mut flags = ResponseFlags::empty();
        if is_network {
            flags = flags.with(ResponseFlags::IS_NETWORK);
        }
        if address.is_some() {
            flags = flags.with(ResponseFlags::HAS_ADDRESS);
        }

        let info = ServerInfo {
            name: self.host.server_name(),
            motd: self.effective_motd(),
            online,
            max,
            version: self.host.version(),
            protocol_version: PROTOCOL_VERSION,
            protocol_hash: self.protocol_hash.clone(),
            address,
        };

        Some(V2Response {
            family,
            request_id: query.request_id,
            flags,
            payload: ResponsePayload::ServerInfo(info),
        })
    }

    async fn build_v2_players(&self, family: V2Family, query: &QueryRequest) -> Option<V2Response> {
        let mut players = self.host.players();

        let is_network = if self.is_primary {
            let aggregate = self.aggregation.get_aggregate(true).await.ok()?;
            let contributed = aggregate.contributed();
            players.extend(aggregate.network_players);
            contributed
        } else {
            false
        };

        players.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.uuid.to_string().cmp(&b.uuid.to_string())));

        let page = paginate_players(&players, query.offset);

        let mut flags = ResponseFlags::empty();
        if page.has_more {
            flags = flags.with(ResponseFlags::HAS_MORE_PLAYERS);
        }
        if is_network {
            flags = flags.with(ResponseFlags::IS_NETWORK);
        }

        Some(V2Response {
            family,
            request_id: query.request_id,
            flags,
            payload: ResponsePayload::PlayerList(page),
        })
    }

    /// Handles one datagram already classified as a V1 request. Returns the
    /// reply bytes to send back to `source`, or `None` if the datagram is
    /// malformed, V1 is disabled, or the source is rate-limited.
    pub async fn handle_v1_datagram(&self, raw: &[u8], source: SocketAddr) -> Option<BytesMut> {
        if !self.v1_enabled {
            return None;
        }
        if !self.rate_limiter.check(source.ip()) {
            self.metrics.record_rate_limit_rejection();
            return None;
        }
        let request = V1Request::decode(raw).ok()?;
        self.metrics.record_v1_query(request.kind == V1Kind::Full);

        let bytes = match &self.cache {
            Some(cache) => {
                let cache_kind = match request.kind {
                    V1Kind::Basic => CacheKind::Basic,
                    V1Kind::Full => CacheKind::Full,
                };
                cache
                    .get(cache_kind, || async move {
                        self.metrics.record_cache_rebuild();
                        self.build_v1_response(request.kind).await.encode().to_vec()
                    })
                    .await
            }
            None => Arc::<[u8]>::from(self.build_v1_response(request.kind).await.encode().to_vec()),
        };

        let mut buf = BytesMut::with_capacity(bytes.len());
        buf.extend_from_slice(&bytes);
        Some(buf)
    }

    /// Builds a fresh V1 response. On a primary whose aggregate read fails,
    /// falls back to local-only counts rather than dropping the datagram: a
    /// V1 reply has no framing to signal a drop mid-build, and the legacy
    /// format is not subject to the same fail-closed guarantee as V2.
    async fn build_v1_response(&self, kind: V1Kind) -> V1Response {
        let local_players = self.host.players();
        let local_online = local_players.len() as u32;
        let local_max = self.host.max_players();
        let port = self.host.bind_port().unwrap_or(crate::host::DEFAULT_BIND_PORT);

        let aggregate = if self.is_primary {
            match self.aggregation.get_aggregate(kind == V1Kind::Full).await {
                Ok(aggregate) => aggregate,
                Err(e) => {
                    log::warn!("v1 query could not reach the fleet aggregate, answering local-only: {e}");
                    Aggregate::empty()
                }
            }
        } else {
            Aggregate::empty()
        };

        let online = local_online + aggregate.total_online;
        let max = local_max + aggregate.total_max;

        let full = if kind == V1Kind::Full {
            let players = if self.show_player_list { local_players } else { Vec::new() };
            let plugins = if self.show_plugins { self.host.plugins() } else { Vec::new() };
            let remote_servers = if self.show_player_list {
                aggregate.remote_servers
            } else {
                aggregate
                    .remote_servers
                    .into_iter()
                    .map(|mut entry| {
                        entry.players.clear();
                        entry
                    })
                    .collect()
            };
            Some(V1FullFields {
                players,
                plugins,
                remote_servers,
            })
        } else {
            None
        };

        V1Response {
            name: self.host.server_name(),
            motd: self.effective_motd(),
            online,
            max,
            port,
            version: self.host.version(),
            full,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hyquery_core::StaticClock;
    use hyquery_cryptography::HmacKey;
    use hyquery_network::RateLimiterConfig;
    use hyquery_protocol::{ChallengeToken, V2Request};
    use uuid::Uuid;

    use super::*;
    use crate::host::StaticHost;

    fn handler(config: HyQueryConfig, host: StaticHost) -> (RequestHandler, Arc<StaticClock>) {
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let rate_limiter = Arc::new(RateLimiter::new(
            RateLimiterConfig {
                capacity: config.rate_limit_burst,
                refill_per_second: config.rate_limit_per_second,
                idle_eviction_after: Duration::from_secs(120),
            },
            clock.clone(),
        ));
        let cache = config
            .cache_enabled
            .then(|| Arc::new(ResponseCache::new(Duration::from_secs(config.cache_ttl_seconds), clock.clone())));
        let challenge = config.v2_enabled.then(|| {
            ChallengeService::new(
                HmacKey::new(config.challenge_secret.as_bytes()),
                clock.clone(),
                config.challenge_token_validity_seconds,
            )
        });
        let metrics = Arc::new(Metrics::new(config.observability.metrics_enabled, config.observability.metrics_detail));
        let aggregation = Arc::new(AggregationView::disabled());

        let handler = RequestHandler::new(
            &config,
            Arc::new(host),
            aggregation,
            rate_limiter,
            cache,
            challenge,
            metrics,
        );
        (handler, clock)
    }

    fn sample_host() -> StaticHost {
        let mut host = StaticHost::default();
        host.server_name = "Test Server".to_string();
        host.players = vec![
            PlayerEntry::local("bob", Uuid::from_u128(2)),
            PlayerEntry::local("alice", Uuid::from_u128(1)),
        ];
        host
    }

    #[tokio::test]
    async fn v1_basic_round_trips_counts() {
        let (handler, _clock) = handler(HyQueryConfig::default(), sample_host());
        let request = V1Request { kind: V1Kind::Basic }.encode();
        let source: SocketAddr = "203.0.113.7:5000".parse().unwrap();

        let reply = handler.handle_v1_datagram(&request, source).await.unwrap();
        let decoded = V1Response::decode(&reply).unwrap();
        assert_eq!(decoded.online, 2);
        assert_eq!(decoded.name, "Test Server");
        assert!(decoded.full.is_none());
    }

    #[tokio::test]
    async fn v2_challenge_then_basic_round_trips() {
        let (handler, _clock) = handler(HyQueryConfig::default(), sample_host());
        let source: SocketAddr = "203.0.113.7:5000".parse().unwrap();

        let challenge_request = V2Request::Challenge { family: V2Family::HyQuery2 }.encode();
        let challenge_reply = handler.handle_v2_datagram(V2Family::HyQuery2, &challenge_request, source).await.unwrap();
        let token = hyquery_protocol::decode_challenge_response(&challenge_reply, V2Family::HyQuery2).unwrap();

        let query = QueryRequest {
            family: V2Family::HyQuery2,
            kind: RequestKind::Basic,
            token,
            request_id: 7,
            flags: 0,
            offset: 0,
            auth_token: None,
        };
        let request_bytes = V2Request::Query(query).encode();
        let reply = handler.handle_v2_datagram(V2Family::HyQuery2, &request_bytes, source).await.unwrap();

        let response = V2Response::decode(&reply, V2Family::HyQuery2).unwrap();
        assert_eq!(response.request_id, 7);
        match response.payload {
            ResponsePayload::ServerInfo(info) => assert_eq!(info.online, 2),
            other => panic!("expected server info, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn v2_query_with_unverified_token_is_dropped() {
        let (handler, _clock) = handler(HyQueryConfig::default(), sample_host());
        let source: SocketAddr = "203.0.113.7:5000".parse().unwrap();
        let bogus_token = ChallengeToken([0u8; 32]);

        let query = QueryRequest {
            family: V2Family::HyQuery2,
            kind: RequestKind::Basic,
            token: bogus_token,
            request_id: 1,
            flags: 0,
            offset: 0,
            auth_token: None,
        };
        let request_bytes = V2Request::Query(query).encode();
        assert!(handler.handle_v2_datagram(V2Family::HyQuery2, &request_bytes, source).await.is_none());
    }

    #[tokio::test]
    async fn players_endpoint_denied_without_auth_gets_minimal_response() {
        let mut config = HyQueryConfig::default();
        config.authentication.public_access = EndpointPermissions { basic: true, players: false };
        let (handler, _clock) = handler(config, sample_host());
        let source: SocketAddr = "203.0.113.7:5000".parse().unwrap();

        let challenge_request = V2Request::Challenge { family: V2Family::HyQuery2 }.encode();
        let challenge_reply = handler.handle_v2_datagram(V2Family::HyQuery2, &challenge_request, source).await.unwrap();
        let token = hyquery_protocol::decode_challenge_response(&challenge_reply, V2Family::HyQuery2).unwrap();

        let query = QueryRequest {
            family: V2Family::HyQuery2,
            kind: RequestKind::Players,
            token,
            request_id: 2,
            flags: 0,
            offset: 0,
            auth_token: None,
        };
        let request_bytes = V2Request::Query(query).encode();
        let reply = handler.handle_v2_datagram(V2Family::HyQuery2, &request_bytes, source).await.unwrap();
        let response = V2Response::decode(&reply, V2Family::HyQuery2).unwrap();

        assert!(response.flags.has(ResponseFlags::AUTH_REQUIRED));
        match response.payload {
            ResponsePayload::ServerInfo(info) => assert_eq!(info.online, 2),
            other => panic!("expected a minimal server-info body alongside AUTH_REQUIRED, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn players_sorted_by_username_then_uuid() {
        let (handler, _clock) = handler(HyQueryConfig::default(), sample_host());
        let source: SocketAddr = "203.0.113.7:5000".parse().unwrap();

        let challenge_request = V2Request::Challenge { family: V2Family::HyQuery2 }.encode();
        let challenge_reply = handler.handle_v2_datagram(V2Family::HyQuery2, &challenge_request, source).await.unwrap();
        let token = hyquery_protocol::decode_challenge_response(&challenge_reply, V2Family::HyQuery2).unwrap();

        let query = QueryRequest {
            family: V2Family::HyQuery2,
            kind: RequestKind::Players,
            token,
            request_id: 3,
            flags: 0,
            offset: 0,
            auth_token: None,
        };
        let request_bytes = V2Request::Query(query).encode();
        let reply = handler.handle_v2_datagram(V2Family::HyQuery2, &request_bytes, source).await.unwrap();
        let response = V2Response::decode(&reply, V2Family::HyQuery2).unwrap();

        match response.payload {
            ResponsePayload::PlayerList(page) => {
                assert_eq!(page.entries[0].username, "alice");
                assert_eq!(page.entries[1].username, "bob");
            }
            other => panic!("expected player list, got {other:?}"),
        }
    }
}
