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

//! Configuration for an embedded HyQuery instance.
//!
//! Mirrors `<server-data>/HyQuery/config.json`. Rather than leaning on
//! `serde(default)` alone, this loads into a fully-`Option`al intermediate
//! ([`RawConfig`]) and runs an explicit defaulting pass ([`HyQueryConfig::from_raw`])
//! because several fields need cross-field defaults (namespace depends on
//! role; `redis.requireAvailable = false` is accepted but ignored and logged).

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Master config for an embedded instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HyQueryConfig {
    pub enabled: bool,
    pub show_player_list: bool,
    pub show_plugins: bool,
    pub use_custom_motd: bool,
    pub custom_motd: String,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_second: f64,
    pub rate_limit_burst: f64,
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub v1_enabled: bool,
    pub v2_enabled: bool,
    pub challenge_token_validity_seconds: u64,
    pub challenge_secret: String,
    pub authentication: AuthenticationConfig,
    pub network: NetworkConfig,
    pub observability: ObservabilityConfig,
}

impl Default for HyQueryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_player_list: true,
            show_plugins: false,
            use_custom_motd: false,
            custom_motd: String::new(),
            rate_limit_enabled: true,
            rate_limit_per_second: 10.0,
            rate_limit_burst: 20.0,
            cache_enabled: true,
            cache_ttl_seconds: 5,
            v1_enabled: true,
            v2_enabled: true,
            challenge_token_validity_seconds: 30,
            challenge_secret: String::new(),
            authentication: AuthenticationConfig::default(),
            network: NetworkConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Per-endpoint access grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPermissions {
    pub basic: bool,
    pub players: bool,
}

/// `authentication` block: public access defaults plus per-token grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationConfig {
    pub public_access: EndpointPermissions,
    pub tokens: HashMap<String, EndpointPermissions>,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            public_access: EndpointPermissions {
                basic: true,
                players: true,
            },
            tokens: HashMap::new(),
        }
    }
}

/// Fleet coordination role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Worker,
}

/// Which coordinator backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorKind {
    Udp,
    Redis,
}

/// `network` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub enabled: bool,
    pub role: Role,
    pub coordinator: CoordinatorKind,
    pub namespace: String,
    pub include_global_namespace: bool,
    pub stale_after_seconds: u64,
    pub log_status_updates: bool,
    pub worker_timeout_seconds: u64,
    pub workers: Vec<WorkerConfigEntry>,
    pub id: String,
    pub key: String,
    pub primary_host: String,
    pub primary_port: u16,
    pub primaries: Vec<PrimaryTarget>,
    pub update_interval_seconds: u64,
    pub redis: RedisConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            role: Role::Worker,
            coordinator: CoordinatorKind::Udp,
            namespace: "default".to_string(),
            include_global_namespace: false,
            stale_after_seconds: 30,
            log_status_updates: false,
            worker_timeout_seconds: 30,
            workers: Vec::new(),
            id: String::new(),
            key: String::new(),
            primary_host: String::new(),
            primary_port: 0,
            primaries: Vec::new(),
            update_interval_seconds: 5,
            redis: RedisConfig::default(),
        }
    }
}

/// One authorized worker id pattern and its shared key (primary-side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfigEntry {
    pub id: String,
    pub key: String,
}

/// One hub target (worker-side `primaries` list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryTarget {
    pub host: String,
    pub port: u16,
}

/// `network.redis` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: u8,
    pub tls: bool,
    pub connect_timeout_millis: u64,
    pub read_timeout_millis: u64,
    pub publish_interval_seconds: u64,
    pub require_available: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: String::new(),
            password: String::new(),
            database: 0,
            tls: false,
            connect_timeout_millis: 1000,
            read_timeout_millis: 1000,
            publish_interval_seconds: 5,
            require_available: true,
        }
    }
}

/// `observability` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityConfig {
    pub log_level: LogLevel,
    pub metrics_enabled: bool,
    pub metrics_detail: MetricsDetail,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            metrics_enabled: true,
            metrics_detail: MetricsDetail::Basic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsDetail {
    Basic,
    Detailed,
}

/// The legacy data folder name migrated away from on load.
const LEGACY_DATA_DIR_NAME: &str = "Hyvote_HyQuery";
const DATA_DIR_NAME: &str = "HyQuery";
const CONFIG_FILE_NAME: &str = "config.json";

/// Permissive mirror of [`HyQueryConfig`] where every field is optional, so
/// that a config file missing keys (or from an older version) still
/// deserializes instead of failing outright.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    enabled: Option<bool>,
    show_player_list: Option<bool>,
    show_plugins: Option<bool>,
    use_custom_motd: Option<bool>,
    custom_motd: Option<String>,
    rate_limit_enabled: Option<bool>,
    rate_limit_per_second: Option<f64>,
    rate_limit_burst: Option<f64>,
    cache_enabled: Option<bool>,
    cache_ttl_seconds: Option<u64>,
    v1_enabled: Option<bool>,
    v2_enabled: Option<bool>,
    challenge_token_validity_seconds: Option<u64>,
    challenge_secret: Option<String>,
    authentication: Option<RawAuthentication>,
    network: Option<RawNetwork>,
    observability: Option<RawObservability>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAuthentication {
    public_access: Option<EndpointPermissions>,
    tokens: Option<HashMap<String, EndpointPermissions>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawNetwork {
    enabled: Option<bool>,
    role: Option<String>,
    coordinator: Option<String>,
    namespace: Option<String>,
    include_global_namespace: Option<bool>,
    stale_after_seconds: Option<u64>,
    log_status_updates: Option<bool>,
    worker_timeout_seconds: Option<u64>,
    workers: Option<Vec<WorkerConfigEntry>>,
    id: Option<String>,
    key: Option<String>,
    primary_host: Option<String>,
    primary_port: Option<u16>,
    primaries: Option<Vec<PrimaryTarget>>,
    update_interval_seconds: Option<u64>,
    redis: Option<RawRedis>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRedis {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    database: Option<u8>,
    tls: Option<bool>,
    connect_timeout_millis: Option<u64>,
    read_timeout_millis: Option<u64>,
    publish_interval_seconds: Option<u64>,
    require_available: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawObservability {
    log_level: Option<String>,
    metrics_enabled: Option<bool>,
    metrics_detail: Option<String>,
}

impl HyQueryConfig {
    /// Loads `<server_data_dir>/HyQuery/config.json`, migrating the legacy
    /// `Hyvote_HyQuery` folder name if present, defaulting any missing
    /// fields, and rewriting the file if anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not valid JSON, or if the
    /// rewrite (on first run, or after defaulting/migration) cannot be written.
    pub fn load(server_data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let server_data_dir = server_data_dir.as_ref();
        let data_dir = migrate_legacy_data_dir(server_data_dir)?;
        let path = data_dir.join(CONFIG_FILE_NAME);

        let (config, changed) = match fs::read_to_string(&path) {
            Ok(contents) => {
                let raw: RawConfig = serde_json::from_str(&contents)?;
                let config = Self::from_raw(raw);
                let rewritten = serde_json::to_string_pretty(&config)? != contents.trim_end();
                (config, rewritten)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no HyQuery config found at {}, writing defaults", path.display());
                (Self::default(), true)
            }
            Err(e) => return Err(e.into()),
        };

        if changed {
            fs::create_dir_all(&data_dir)?;
            fs::write(&path, serde_json::to_string_pretty(&config)?)?;
        }

        Ok(config)
    }

    fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let network = raw
            .network
            .map(|n| NetworkConfig::from_raw(n, &defaults.network))
            .unwrap_or(defaults.network.clone());

        Self {
            enabled: raw.enabled.unwrap_or(defaults.enabled),
            show_player_list: raw.show_player_list.unwrap_or(defaults.show_player_list),
            show_plugins: raw.show_plugins.unwrap_or(defaults.show_plugins),
            use_custom_motd: raw.use_custom_motd.unwrap_or(defaults.use_custom_motd),
            custom_motd: raw.custom_motd.unwrap_or(defaults.custom_motd),
            rate_limit_enabled: raw.rate_limit_enabled.unwrap_or(defaults.rate_limit_enabled),
            rate_limit_per_second: raw.rate_limit_per_second.unwrap_or(defaults.rate_limit_per_second),
            rate_limit_burst: raw.rate_limit_burst.unwrap_or(defaults.rate_limit_burst),
            cache_enabled: raw.cache_enabled.unwrap_or(defaults.cache_enabled),
            cache_ttl_seconds: raw.cache_ttl_seconds.unwrap_or(defaults.cache_ttl_seconds),
            v1_enabled: raw.v1_enabled.unwrap_or(defaults.v1_enabled),
            v2_enabled: raw.v2_enabled.unwrap_or(defaults.v2_enabled),
            challenge_token_validity_seconds: raw
                .challenge_token_validity_seconds
                .unwrap_or(defaults.challenge_token_validity_seconds),
            challenge_secret: raw.challenge_secret.unwrap_or(defaults.challenge_secret),
            authentication: raw
                .authentication
                .map(|a| AuthenticationConfig {
                    public_access: a.public_access.unwrap_or(defaults.authentication.public_access),
                    tokens: a.tokens.unwrap_or_default(),
                })
                .unwrap_or(defaults.authentication),
            network,
            observability: raw
                .observability
                .map(|o| ObservabilityConfig::from_raw(o, &defaults.observability))
                .unwrap_or(defaults.observability),
        }
    }
}

impl NetworkConfig {
    fn from_raw(raw: RawNetwork, defaults: &Self) -> Self {
        let role = raw
            .role
            .and_then(|s| match s.to_lowercase().as_str() {
                "primary" => Some(Role::Primary),
                "worker" => Some(Role::Worker),
                _ => None,
            })
            .unwrap_or(defaults.role);

        let coordinator = raw
            .coordinator
            .and_then(|s| match s.to_lowercase().as_str() {
                "udp" => Some(CoordinatorKind::Udp),
                "redis" => Some(CoordinatorKind::Redis),
                _ => None,
            })
            .unwrap_or(defaults.coordinator);

        let redis = raw.redis.map(RedisConfig::from_raw).unwrap_or(defaults.redis.clone());
        if !redis.require_available {
            log::warn!("network.redis.requireAvailable=false is accepted but ignored; shared-store mode is always fail-closed");
        }

        Self {
            enabled: raw.enabled.unwrap_or(defaults.enabled),
            role,
            coordinator,
            namespace: raw.namespace.unwrap_or_else(|| defaults.namespace.clone()),
            include_global_namespace: raw.include_global_namespace.unwrap_or(defaults.include_global_namespace),
            stale_after_seconds: raw.stale_after_seconds.unwrap_or(defaults.stale_after_seconds),
            log_status_updates: raw.log_status_updates.unwrap_or(defaults.log_status_updates),
            worker_timeout_seconds: raw.worker_timeout_seconds.unwrap_or(defaults.worker_timeout_seconds),
            workers: raw.workers.unwrap_or_default(),
            id: raw.id.unwrap_or_default(),
            key: raw.key.unwrap_or_default(),
            primary_host: raw.primary_host.unwrap_or_default(),
            primary_port: raw.primary_port.unwrap_or(defaults.primary_port),
            primaries: raw.primaries.unwrap_or_default(),
            update_interval_seconds: raw.update_interval_seconds.unwrap_or(defaults.update_interval_seconds),
            redis,
        }
    }
}

impl RedisConfig {
    fn from_raw(raw: RawRedis) -> Self {
        let defaults = Self::default();
        Self {
            host: raw.host.unwrap_or(defaults.host),
            port: raw.port.unwrap_or(defaults.port),
            username: raw.username.unwrap_or(defaults.username),
            password: raw.password.unwrap_or(defaults.password),
            database: raw.database.unwrap_or(defaults.database),
            tls: raw.tls.unwrap_or(defaults.tls),
            connect_timeout_millis: raw.connect_timeout_millis.unwrap_or(defaults.connect_timeout_millis),
            read_timeout_millis: raw.read_timeout_millis.unwrap_or(defaults.read_timeout_millis),
            publish_interval_seconds: raw.publish_interval_seconds.unwrap_or(defaults.publish_interval_seconds),
            require_available: raw.require_available.unwrap_or(defaults.require_available),
        }
    }
}

impl ObservabilityConfig {
    fn from_raw(raw: RawObservability, defaults: &Self) -> Self {
        let log_level = raw
            .log_level
            .and_then(|s| match s.to_lowercase().as_str() {
                "error" => Some(LogLevel::Error),
                "warn" => Some(LogLevel::Warn),
                "info" => Some(LogLevel::Info),
                "debug" => Some(LogLevel::Debug),
                _ => None,
            })
            .unwrap_or(defaults.log_level);

        let metrics_detail = raw
            .metrics_detail
            .and_then(|s| match s.to_lowercase().as_str() {
                "basic" => Some(MetricsDetail::Basic),
                "detailed" => Some(MetricsDetail::Detailed),
                _ => None,
            })
            .unwrap_or(defaults.metrics_detail);

        Self {
            log_level,
            metrics_enabled: raw.metrics_enabled.unwrap_or(defaults.metrics_enabled),
            metrics_detail,
        }
    }
}

/// Renames a legacy `Hyvote_HyQuery` data folder to `HyQuery` if the legacy
/// folder exists and the new one does not, then returns the (possibly just
/// created) `HyQuery` path.
fn migrate_legacy_data_dir(server_data_dir: &Path) -> anyhow::Result<PathBuf> {
    let legacy = server_data_dir.join(LEGACY_DATA_DIR_NAME);
    let current = server_data_dir.join(DATA_DIR_NAME);
    if legacy.is_dir() && !current.exists() {
        log::info!("migrating legacy data folder '{LEGACY_DATA_DIR_NAME}' to '{DATA_DIR_NAME}'");
        fs::rename(&legacy, &current)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    #[rstest]
    fn default_config_matches_spec_defaults() {
        let config = HyQueryConfig::default();
        assert!(config.enabled);
        assert_eq!(config.rate_limit_per_second, 10.0);
        assert_eq!(config.rate_limit_burst, 20.0);
        assert_eq!(config.cache_ttl_seconds, 5);
        assert_eq!(config.challenge_token_validity_seconds, 30);
        assert_eq!(config.network.role, Role::Worker);
        assert_eq!(config.network.coordinator, CoordinatorKind::Udp);
        assert_eq!(config.observability.log_level, LogLevel::Info);
    }

    #[rstest]
    #[case("primary", Role::Primary)]
    #[case("PRIMARY", Role::Primary)]
    #[case("worker", Role::Worker)]
    #[case("nonsense", Role::Worker)]
    fn role_normalizes_case_and_falls_back_on_unknown(#[case] input: &str, #[case] expected: Role) {
        let raw = RawNetwork {
            role: Some(input.to_string()),
            ..Default::default()
        };
        let network = NetworkConfig::from_raw(raw, &NetworkConfig::default());
        assert_eq!(network.role, expected);
    }

    #[rstest]
    fn missing_fields_are_filled_from_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config = HyQueryConfig::from_raw(raw);
        assert_eq!(config, HyQueryConfig::default());
    }

    #[rstest]
    fn partial_json_preserves_explicit_values_and_defaults_the_rest() {
        let raw: RawConfig = serde_json::from_str(r#"{"enabled": false, "rateLimitPerSecond": 1.0}"#).unwrap();
        let config = HyQueryConfig::from_raw(raw);
        assert!(!config.enabled);
        assert_eq!(config.rate_limit_per_second, 1.0);
        assert_eq!(config.rate_limit_burst, 20.0);
    }

    #[rstest]
    fn round_trip_through_json_is_lossless_after_defaulting() {
        let config = HyQueryConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let raw: RawConfig = serde_json::from_str(&json).unwrap();
        let reloaded = HyQueryConfig::from_raw(raw);
        assert_eq!(config, reloaded);
    }

    #[rstest]
    fn require_available_false_is_accepted_but_left_as_configured() {
        let raw = RawNetwork {
            redis: Some(RawRedis {
                require_available: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let network = NetworkConfig::from_raw(raw, &NetworkConfig::default());
        assert!(!network.redis.require_available);
    }

    #[rstest]
    fn load_writes_defaults_on_first_run_and_reloads_identically() {
        let dir = tempdir().unwrap();
        let first = HyQueryConfig::load(dir.path()).unwrap();
        assert_eq!(first, HyQueryConfig::default());

        let config_path = dir.path().join(DATA_DIR_NAME).join(CONFIG_FILE_NAME);
        assert!(config_path.exists());

        let second = HyQueryConfig::load(dir.path()).unwrap();
        assert_eq!(second, first);
    }

    #[rstest]
    fn load_migrates_legacy_data_folder() {
        let dir = tempdir().unwrap();
        let legacy_dir = dir.path().join(LEGACY_DATA_DIR_NAME);
        fs::create_dir_all(&legacy_dir).unwrap();
        fs::write(legacy_dir.join(CONFIG_FILE_NAME), serde_json::to_string(&HyQueryConfig::default()).unwrap()).unwrap();

        let _config = HyQueryConfig::load(dir.path()).unwrap();

        assert!(!legacy_dir.exists());
        assert!(dir.path().join(DATA_DIR_NAME).join(CONFIG_FILE_NAME).exists());
    }
}
