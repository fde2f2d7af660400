//! Opened GeoIP databases.
//!
//! [`GeoDatabase`] is the seam between the refresh lifecycle and the engine
//! that actually answers lookups. [`MaxMindDatabase`] is the production
//! implementation over the `maxminddb` reader.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use maxminddb::Reader;

use super::types::{AsnRecord, CityRecord, CountryRecord, DatabaseMetadata};
use crate::error_handling::{GeoError, GeoResult};

const NOT_FOUND: &str = "address not found in database";

/// A database opened from a snapshot file.
///
/// Implementations must not keep the file open after [`open`](Self::open)
/// returns: snapshot files may be pruned while a database built from them is
/// still serving lookups.
pub trait GeoDatabase: Send + Sync + Sized + 'static {
    /// Opens the snapshot at `path`.
    ///
    /// # Errors
    ///
    /// `GeoError::Storage` if the file cannot be read,
    /// `GeoError::InvalidDatabase` if its contents are not a usable database.
    fn open(path: &Path) -> GeoResult<Self>;

    /// City-level lookup.
    fn city(&self, ip: IpAddr) -> GeoResult<CityRecord>;

    /// Country-level lookup.
    fn country(&self, ip: IpAddr) -> GeoResult<CountryRecord>;

    /// Autonomous system lookup.
    fn asn(&self, ip: IpAddr) -> GeoResult<AsnRecord>;

    /// Metadata recorded in the database itself.
    fn metadata(&self) -> DatabaseMetadata;
}

/// A MaxMind DB file held fully in memory.
pub struct MaxMindDatabase {
    reader: Reader<Vec<u8>>,
    path: PathBuf,
}

impl MaxMindDatabase {
    /// Snapshot file this database was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GeoDatabase for MaxMindDatabase {
    fn open(path: &Path) -> GeoResult<Self> {
        let db_bytes = std::fs::read(path).map_err(|e| GeoError::storage(path, e))?;
        let reader = Reader::from_source(db_bytes).map_err(|e| GeoError::InvalidDatabase {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::debug!(
            "Opened {} (build_epoch {})",
            path.display(),
            reader.metadata.build_epoch
        );
        Ok(Self {
            reader,
            path: path.to_path_buf(),
        })
    }

    fn city(&self, ip: IpAddr) -> GeoResult<CityRecord> {
        // maxminddb 0.27: lookup() yields a LookupResult; has_data() before decode()
        let city_lookup = self
            .reader
            .lookup(ip)
            .map_err(|e| GeoError::query(ip, e))?;
        if !city_lookup.has_data() {
            return Err(GeoError::query(ip, NOT_FOUND));
        }
        let city: maxminddb::geoip2::City = match city_lookup.decode() {
            Ok(Some(city)) => city,
            Ok(None) => return Err(GeoError::query(ip, NOT_FOUND)),
            Err(e) => return Err(GeoError::query(ip, e)),
        };

        Ok(CityRecord {
            country_code: city.country.iso_code.map(|s| s.to_string()),
            country_name: city.country.names.english.map(|s| s.to_string()),
            region: city
                .subdivisions
                .first()
                .and_then(|subdivision| subdivision.names.english)
                .map(|s| s.to_string()),
            city: city.city.names.english.map(|s| s.to_string()),
            latitude: city.location.latitude,
            longitude: city.location.longitude,
            postal_code: city.postal.code.map(|s| s.to_string()),
            timezone: city.location.time_zone.map(|s| s.to_string()),
        })
    }

    fn country(&self, ip: IpAddr) -> GeoResult<CountryRecord> {
        let country_lookup = self
            .reader
            .lookup(ip)
            .map_err(|e| GeoError::query(ip, e))?;
        if !country_lookup.has_data() {
            return Err(GeoError::query(ip, NOT_FOUND));
        }
        let country: maxminddb::geoip2::Country = match country_lookup.decode() {
            Ok(Some(country)) => country,
            Ok(None) => return Err(GeoError::query(ip, NOT_FOUND)),
            Err(e) => return Err(GeoError::query(ip, e)),
        };

        Ok(CountryRecord {
            country_code: country.country.iso_code.map(|s| s.to_string()),
            country_name: country.country.names.english.map(|s| s.to_string()),
        })
    }

    fn asn(&self, ip: IpAddr) -> GeoResult<AsnRecord> {
        let asn_lookup = self
            .reader
            .lookup(ip)
            .map_err(|e| GeoError::query(ip, e))?;
        if !asn_lookup.has_data() {
            return Err(GeoError::query(ip, NOT_FOUND));
        }
        match asn_lookup.decode::<maxminddb::geoip2::Asn>() {
            Ok(Some(asn)) => Ok(AsnRecord {
                asn: asn.autonomous_system_number,
                asn_org: asn.autonomous_system_organization.map(|s| s.to_string()),
            }),
            Ok(None) => Err(GeoError::query(ip, NOT_FOUND)),
            Err(e) => Err(GeoError::query(ip, e)),
        }
    }

    fn metadata(&self) -> DatabaseMetadata {
        DatabaseMetadata {
            database_type: self.reader.metadata.database_type.clone(),
            build_epoch: self.reader.metadata.build_epoch,
            ip_version: self.reader.metadata.ip_version,
        }
    }
}
