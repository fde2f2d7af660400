//! Command-line options for the `geoip_refresh` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    DEFAULT_DATABASE_PREFIX, DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_MAXMIND_EDITION,
    DEFAULT_REFRESH_DAYS, MAX_NETWORK_DOWNLOAD_ATTEMPTS,
};
use crate::config::types::{GeoReaderConfig, LogFormat, LogLevel, RetentionPolicy, SourceConfig};
use crate::error_handling::{GeoError, GeoResult};

/// Command-line options.
///
/// # Examples
///
/// ```bash
/// # Look up two addresses (MAXMIND_LICENSE_KEY from the environment or .env)
/// geoip_refresh lookup 8.8.8.8 2001:4860:4860::8888
///
/// # Refresh weekly from a bucket, keeping the last three snapshots
/// geoip_refresh --s3-bucket geo-data --refresh-days 7 --keep-snapshots 3 refresh
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "geoip_refresh",
    about = "Keeps a GeoIP database cached locally and answers lookups from it."
)]
pub struct Opt {
    /// Cache directory for snapshots (default: {temp}/maxmind_wrapper)
    #[arg(long, value_parser)]
    pub cache_dir: Option<PathBuf>,

    /// Snapshot age in days after which it is refreshed
    #[arg(long, default_value_t = DEFAULT_REFRESH_DAYS)]
    pub refresh_days: u64,

    /// Snapshot file prefix (also the archive member and default object key)
    #[arg(long, default_value = DEFAULT_DATABASE_PREFIX)]
    pub database_prefix: String,

    /// MaxMind license key (falls back to MAXMIND_LICENSE_KEY)
    #[arg(long)]
    pub license_key: Option<String>,

    /// MaxMind edition to download
    #[arg(long, default_value = DEFAULT_MAXMIND_EDITION)]
    pub edition: String,

    /// Fetch snapshots from this S3 bucket instead of MaxMind
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Object key inside the bucket (default: the database prefix)
    #[arg(long, requires = "s3_bucket")]
    pub s3_key: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[arg(long, requires = "s3_bucket")]
    pub s3_endpoint: Option<String>,

    /// Keep only the newest N snapshots after each refresh
    #[arg(long)]
    pub keep_snapshots: Option<usize>,

    /// Download timeout in seconds
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_TIMEOUT.as_secs())]
    pub timeout_seconds: u64,

    /// Download attempts before a refresh fails
    #[arg(long, default_value_t = MAX_NETWORK_DOWNLOAD_ATTEMPTS)]
    pub max_attempts: usize,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// What the binary does once the reader is ready.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up addresses and print one JSON object per line
    Lookup {
        /// Record type to return
        #[arg(long, value_enum, default_value_t = LookupKind::City)]
        kind: LookupKind,

        /// IPv4/IPv6 addresses, or their integer form
        #[arg(required = true)]
        ips: Vec<String>,
    },
    /// Fetch a new snapshot now, regardless of age
    Refresh,
    /// Print the current snapshot and refresh schedule
    Status,
}

/// Record type for `lookup`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LookupKind {
    City,
    Country,
    Asn,
}

impl Opt {
    /// Builds the library configuration these options describe.
    ///
    /// # Errors
    ///
    /// `GeoError::Config` when a license key and a bucket are both given.
    pub fn reader_config(&self) -> GeoResult<GeoReaderConfig> {
        // Without an explicit key the object is named like the snapshots
        let object_key = self
            .s3_key
            .clone()
            .unwrap_or_else(|| self.database_prefix.clone());
        let source = match SourceConfig::from_options(
            self.license_key.clone(),
            self.s3_bucket.clone(),
            Some(object_key),
        )? {
            SourceConfig::MaxMind {
                license_key,
                base_url,
                ..
            } => SourceConfig::MaxMind {
                license_key,
                edition_id: self.edition.clone(),
                base_url,
            },
            SourceConfig::ObjectStore {
                bucket,
                key,
                access_key_id,
                secret_access_key,
                session_token,
                region,
                ..
            } => SourceConfig::ObjectStore {
                bucket,
                key,
                access_key_id,
                secret_access_key,
                session_token,
                region,
                endpoint: self.s3_endpoint.clone(),
            },
        };

        let retention = match self.keep_snapshots {
            Some(0) => {
                return Err(GeoError::Config(
                    "--keep-snapshots must be at least 1".to_string(),
                ))
            }
            Some(n) => RetentionPolicy::KeepLatest(n),
            None => RetentionPolicy::KeepAll,
        };

        Ok(GeoReaderConfig {
            refresh_days: self.refresh_days,
            cache_dir: self.cache_dir.clone(),
            database_prefix: self.database_prefix.clone(),
            source,
            retention,
            download_timeout: Duration::from_secs(self.timeout_seconds),
            max_download_attempts: self.max_attempts.max(1),
        })
    }
}
