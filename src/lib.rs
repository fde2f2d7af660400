//! geoip_refresh library: self-refreshing GeoIP lookups
//!
//! This library keeps a MaxMind GeoIP database cached on local disk as
//! timestamped snapshots, replaces it once it is older than a configured
//! interval, and answers IP lookups from the current snapshot.
//!
//! # Example
//!
//! ```no_run
//! use geoip_refresh::{GeoReader, GeoReaderConfig, SourceConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GeoReaderConfig {
//!     refresh_days: 14,
//!     source: SourceConfig::maxmind(Some("my-license-key".to_string())),
//!     ..Default::default()
//! };
//!
//! let reader = GeoReader::open(config).await?;
//! let city = reader.city("8.8.8.8").await?;
//! println!("{:?} {:?}", city.country_code, city.city);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Refreshes run inline on the task
//! that issued the query which found the snapshot stale.

pub mod config;
mod error_handling;
mod geoip;
pub mod initialization;
pub mod policy;
pub mod snapshot;
pub mod source;

// Re-export public API
pub use config::{GeoReaderConfig, LogFormat, LogLevel, RetentionPolicy, SourceConfig};
pub use error_handling::{GeoError, GeoResult, InitializationError};
pub use geoip::{
    AsnRecord, CityRecord, CountryRecord, DatabaseMetadata, GeoDatabase, GeoReader, IpInput,
    MaxMindDatabase,
};
pub use policy::{Clock, RefreshPolicy, SystemClock};
pub use snapshot::{SnapshotHandle, SnapshotStore};
pub use source::{SnapshotSource, Source};
