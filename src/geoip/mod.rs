//! GeoIP lookups over a refreshed snapshot.
//!
//! [`GeoReader`] ties the snapshot cache, a snapshot source and the refresh
//! policy together and answers City, Country and ASN lookups from whichever
//! snapshot is current.

mod address;
mod database;
mod reader;
mod types;

// Re-export public API
pub use address::IpInput;
pub use database::{GeoDatabase, MaxMindDatabase};
pub use reader::GeoReader;
pub use types::{AsnRecord, CityRecord, CountryRecord, DatabaseMetadata};
