//! GeoIP data structures.
//!
//! Owned lookup results, detached from the database buffer so they can outlive
//! a reader swap.

use serde::Serialize;

/// City-level lookup result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityRecord {
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal_code: Option<String>,
    pub timezone: Option<String>,
}

/// Country-level lookup result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountryRecord {
    pub country_code: Option<String>,
    pub country_name: Option<String>,
}

/// Autonomous system lookup result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AsnRecord {
    pub asn: Option<u32>,
    pub asn_org: Option<String>,
}

/// Metadata about the loaded database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseMetadata {
    /// Database type, e.g. "GeoIP2-City"
    pub database_type: String,
    /// Build time in epoch seconds (set by the publisher, not by this cache)
    pub build_epoch: u64,
    /// 4 or 6
    pub ip_version: u16,
}
