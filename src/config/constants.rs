//! Configuration constants.
//!
//! This module defines the defaults used by the snapshot cache and the
//! snapshot sources: refresh interval, file naming, download limits and the
//! environment variables consulted for credentials.

use std::time::Duration;

/// Default refresh interval in days.
pub const DEFAULT_REFRESH_DAYS: u64 = 14;

/// Seconds per day, used to turn `refresh_days` into a staleness interval.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Default snapshot family prefix.
///
/// Also the name of the archive member extracted from MaxMind downloads and
/// the default object key in object storage.
pub const DEFAULT_DATABASE_PREFIX: &str = "GeoIP2-City.mmdb";

/// Name of the cache subdirectory created under the system temp directory
/// when no cache directory is configured.
pub const DEFAULT_CACHE_SUBDIR: &str = "maxmind_wrapper";

/// Width of the zero-padded epoch-seconds suffix in snapshot file names.
///
/// Must stay at 11 to remain compatible with existing caches.
pub const SNAPSHOT_TIMESTAMP_WIDTH: usize = 11;

// MaxMind download
/// MaxMind download endpoint
pub const MAXMIND_DOWNLOAD_BASE: &str = "https://download.maxmind.com/app/geoip_download";
/// Edition fetched by default
pub const DEFAULT_MAXMIND_EDITION: &str = "GeoIP2-City";

// Object storage
/// Region used when neither the config nor `AWS_REGION` names one
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

// Environment variables consulted during credential resolution
/// Environment variable name for MaxMind license key
pub const MAXMIND_LICENSE_KEY_ENV: &str = "MAXMIND_LICENSE_KEY";
pub const AWS_ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
pub const AWS_REGION_ENV: &str = "AWS_REGION";

// Download limits
/// Per-request timeout for snapshot downloads.
/// City databases run to tens of megabytes, so this is generous.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
/// Maximum GeoIP download size in bytes (500MB)
/// Prevents memory exhaustion from malicious or oversized downloads
pub const MAX_GEOIP_DOWNLOAD_SIZE: usize = 500 * 1024 * 1024;
/// Maximum download attempts (initial attempt plus retries)
pub const MAX_NETWORK_DOWNLOAD_ATTEMPTS: usize = 3;
/// Exponential backoff base; with `RETRY_FACTOR` the delays run 2s, 4s, 8s...
pub const RETRY_BACKOFF_BASE_MS: u64 = 2;
/// Multiplier applied to every backoff step (milliseconds to seconds)
pub const RETRY_FACTOR: u64 = 1_000;
/// Maximum delay between download retries
pub const RETRY_MAX_DELAY_SECS: u64 = 30;

/// User-Agent sent with snapshot downloads.
pub const DEFAULT_USER_AGENT: &str = concat!("geoip_refresh/", env!("CARGO_PKG_VERSION"));
