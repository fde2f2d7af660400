//! Configuration types.
//!
//! This module defines the library configuration used to build a
//! [`GeoReader`](crate::GeoReader), the credential-bearing source selection,
//! and the logging enums shared with the CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    AWS_ACCESS_KEY_ID_ENV, AWS_REGION_ENV, AWS_SECRET_ACCESS_KEY_ENV, AWS_SESSION_TOKEN_ENV,
    DEFAULT_AWS_REGION, DEFAULT_CACHE_SUBDIR, DEFAULT_DATABASE_PREFIX, DEFAULT_DOWNLOAD_TIMEOUT,
    DEFAULT_MAXMIND_EDITION, DEFAULT_REFRESH_DAYS, MAXMIND_DOWNLOAD_BASE,
    MAXMIND_LICENSE_KEY_ENV, MAX_NETWORK_DOWNLOAD_ATTEMPTS,
};
use crate::error_handling::{GeoError, GeoResult};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// What happens to superseded snapshots after a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Never delete old snapshots; the cache directory grows with every refresh.
    #[default]
    KeepAll,
    /// Keep only the newest `n` snapshots (at least one is always kept).
    KeepLatest(usize),
}

/// Where fresh snapshots come from, as configured by the caller.
///
/// Credentials left as `None` fall back to environment variables when the
/// configuration is resolved (see [`GeoReaderConfig::resolve_source`]).
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// MaxMind's download service (tar.gz archive).
    MaxMind {
        /// License key; falls back to `MAXMIND_LICENSE_KEY`.
        license_key: Option<String>,
        /// Edition id, e.g. `GeoIP2-City`.
        edition_id: String,
        /// Download endpoint; overridable for mirrors and tests.
        base_url: String,
    },
    /// A single object in an S3-compatible bucket.
    ObjectStore {
        /// Bucket name.
        bucket: String,
        /// Object key holding the raw database.
        key: String,
        /// Falls back to `AWS_ACCESS_KEY_ID`.
        access_key_id: Option<String>,
        /// Falls back to `AWS_SECRET_ACCESS_KEY`.
        secret_access_key: Option<String>,
        /// Falls back to `AWS_SESSION_TOKEN` (optional).
        session_token: Option<String>,
        /// Falls back to `AWS_REGION`, then `us-east-1`.
        region: Option<String>,
        /// Custom endpoint for S3-compatible stores; defaults to AWS.
        endpoint: Option<String>,
    },
}

impl SourceConfig {
    /// MaxMind source with default edition and endpoint.
    pub fn maxmind(license_key: Option<String>) -> Self {
        SourceConfig::MaxMind {
            license_key,
            edition_id: DEFAULT_MAXMIND_EDITION.to_string(),
            base_url: MAXMIND_DOWNLOAD_BASE.to_string(),
        }
    }

    /// Object store source with credentials left to environment fallback.
    pub fn object_store(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        SourceConfig::ObjectStore {
            bucket: bucket.into(),
            key: key.into(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            region: None,
            endpoint: None,
        }
    }

    /// Picks the source from loose options the way the CLI exposes them.
    ///
    /// A bucket selects object storage, otherwise MaxMind is used. Supplying
    /// both a license key and a bucket is contradictory and rejected.
    pub fn from_options(
        license_key: Option<String>,
        bucket: Option<String>,
        key: Option<String>,
    ) -> GeoResult<Self> {
        match (license_key, bucket) {
            (Some(_), Some(_)) => Err(GeoError::Config(
                "both a MaxMind license key and an object store bucket were given; configure exactly one source"
                    .to_string(),
            )),
            (_, Some(bucket)) => Ok(SourceConfig::object_store(
                bucket,
                key.unwrap_or_else(|| DEFAULT_DATABASE_PREFIX.to_string()),
            )),
            (license_key, None) => Ok(SourceConfig::maxmind(license_key)),
        }
    }
}

/// Library configuration for a [`GeoReader`](crate::GeoReader).
///
/// # Examples
///
/// ```no_run
/// use geoip_refresh::{GeoReaderConfig, SourceConfig};
///
/// let config = GeoReaderConfig {
///     refresh_days: 7,
///     source: SourceConfig::maxmind(Some("my-license-key".to_string())),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct GeoReaderConfig {
    /// Snapshot age (in days) after which it is refreshed; 0 refreshes
    /// once the save second has passed
    pub refresh_days: u64,

    /// Cache directory; defaults to `{temp}/maxmind_wrapper`
    pub cache_dir: Option<PathBuf>,

    /// Snapshot family prefix (also the archive member / object key suffix)
    pub database_prefix: String,

    /// Snapshot source and its credentials
    pub source: SourceConfig,

    /// Retention of superseded snapshots
    pub retention: RetentionPolicy,

    /// Per-request download timeout
    pub download_timeout: Duration,

    /// Download attempts before a fetch is reported as failed
    pub max_download_attempts: usize,
}

impl Default for GeoReaderConfig {
    fn default() -> Self {
        Self {
            refresh_days: DEFAULT_REFRESH_DAYS,
            cache_dir: None,
            database_prefix: DEFAULT_DATABASE_PREFIX.to_string(),
            source: SourceConfig::maxmind(None),
            retention: RetentionPolicy::KeepAll,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            max_download_attempts: MAX_NETWORK_DOWNLOAD_ATTEMPTS,
        }
    }
}

/// A source with every credential resolved.
#[derive(Clone)]
pub enum ResolvedSource {
    /// MaxMind download with a non-empty license key.
    MaxMind {
        license_key: String,
        edition_id: String,
        base_url: String,
    },
    /// Object store with complete credentials.
    ObjectStore(ObjectStoreCredentials),
}

/// Everything needed to sign an object store request.
#[derive(Clone)]
pub struct ObjectStoreCredentials {
    pub bucket: String,
    pub key: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
}

// Hand-written so secrets never reach log output.
impl std::fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedSource::MaxMind {
                edition_id,
                base_url,
                ..
            } => f
                .debug_struct("MaxMind")
                .field("edition_id", edition_id)
                .field("base_url", base_url)
                .field("license_key", &"<redacted>")
                .finish(),
            ResolvedSource::ObjectStore(creds) => std::fmt::Debug::fmt(creds, f),
        }
    }
}

impl std::fmt::Debug for ObjectStoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl GeoReaderConfig {
    /// Cache directory to use, applying the temp-dir default.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_SUBDIR))
    }

    /// Resolves credentials against the process environment.
    pub fn resolve_source(&self) -> GeoResult<ResolvedSource> {
        self.resolve_source_with(|name| std::env::var(name).ok())
    }

    /// Resolves credentials, consulting `lookup_env` for anything unset.
    ///
    /// Empty values count as missing.
    pub fn resolve_source_with<F>(&self, lookup_env: F) -> GeoResult<ResolvedSource>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.database_prefix.is_empty() {
            return Err(GeoError::Config(
                "database_prefix must not be empty".to_string(),
            ));
        }

        let pick = |explicit: &Option<String>, env_name: &str| -> Option<String> {
            explicit
                .clone()
                .or_else(|| lookup_env(env_name))
                .filter(|v| !v.is_empty())
        };

        match &self.source {
            SourceConfig::MaxMind {
                license_key,
                edition_id,
                base_url,
            } => {
                let license_key = pick(license_key, MAXMIND_LICENSE_KEY_ENV).ok_or_else(|| {
                    GeoError::Config(format!(
                        "no MaxMind license key configured and {} is not set",
                        MAXMIND_LICENSE_KEY_ENV
                    ))
                })?;
                Ok(ResolvedSource::MaxMind {
                    license_key,
                    edition_id: edition_id.clone(),
                    base_url: base_url.clone(),
                })
            }
            SourceConfig::ObjectStore {
                bucket,
                key,
                access_key_id,
                secret_access_key,
                session_token,
                region,
                endpoint,
            } => {
                if bucket.is_empty() {
                    return Err(GeoError::Config(
                        "object store bucket must not be empty".to_string(),
                    ));
                }
                let access_key_id = pick(access_key_id, AWS_ACCESS_KEY_ID_ENV).ok_or_else(|| {
                    GeoError::Config(format!(
                        "no access key id configured and {} is not set",
                        AWS_ACCESS_KEY_ID_ENV
                    ))
                })?;
                let secret_access_key = pick(secret_access_key, AWS_SECRET_ACCESS_KEY_ENV)
                    .ok_or_else(|| {
                        GeoError::Config(format!(
                            "no secret access key configured and {} is not set",
                            AWS_SECRET_ACCESS_KEY_ENV
                        ))
                    })?;
                Ok(ResolvedSource::ObjectStore(ObjectStoreCredentials {
                    bucket: bucket.clone(),
                    key: key.clone(),
                    access_key_id,
                    secret_access_key,
                    session_token: pick(session_token, AWS_SESSION_TOKEN_ENV),
                    region: pick(region, AWS_REGION_ENV)
                        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                    endpoint: endpoint.clone(),
                }))
            }
        }
    }
}
