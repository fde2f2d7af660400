//! Snapshot sources.
//!
//! A source fetches the full serialized database (already extracted from any
//! archive) from a remote origin. Two origins are supported:
//! - MaxMind's download service (dated tar.gz releases)
//! - an object in an S3-compatible bucket

mod archive;
mod download;
mod extract;
mod object_store;
mod sigv4;

use std::future::Future;

pub use archive::{release_date, RemoteArchiveSource};
pub use object_store::ObjectStoreSource;

use crate::config::ResolvedSource;
use crate::error_handling::GeoResult;

/// Fetches fresh snapshot bytes from a remote origin.
pub trait SnapshotSource: Send + Sync {
    /// Retrieves the complete database.
    ///
    /// # Errors
    ///
    /// `GeoError::Fetch` carrying the underlying transport failure.
    fn fetch(&self) -> impl Future<Output = GeoResult<Vec<u8>>> + Send;

    /// Human-readable origin, safe to log (no credentials).
    fn describe(&self) -> String;
}

/// The source configured for a reader: exactly one origin.
#[derive(Clone)]
pub enum Source {
    RemoteArchive(RemoteArchiveSource),
    ObjectStore(ObjectStoreSource),
}

impl Source {
    /// Builds the source for resolved credentials.
    ///
    /// `member_suffix` names the archive member to extract from MaxMind
    /// downloads.
    pub fn from_resolved(
        resolved: ResolvedSource,
        client: reqwest::Client,
        member_suffix: &str,
        max_attempts: usize,
    ) -> GeoResult<Self> {
        match resolved {
            ResolvedSource::MaxMind {
                license_key,
                edition_id,
                base_url,
            } => Ok(Source::RemoteArchive(RemoteArchiveSource::new(
                client,
                base_url,
                edition_id,
                license_key,
                member_suffix,
                max_attempts,
            ))),
            ResolvedSource::ObjectStore(credentials) => Ok(Source::ObjectStore(
                ObjectStoreSource::new(client, credentials, max_attempts)?,
            )),
        }
    }
}

impl SnapshotSource for Source {
    async fn fetch(&self) -> GeoResult<Vec<u8>> {
        match self {
            Source::RemoteArchive(source) => source.fetch().await,
            Source::ObjectStore(source) => source.fetch().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Source::RemoteArchive(source) => source.describe(),
            Source::ObjectStore(source) => source.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObjectStoreCredentials;

    #[test]
    fn test_from_resolved_maxmind() {
        let source = Source::from_resolved(
            ResolvedSource::MaxMind {
                license_key: "key".to_string(),
                edition_id: "GeoIP2-City".to_string(),
                base_url: "https://download.maxmind.com/app/geoip_download".to_string(),
            },
            reqwest::Client::new(),
            "GeoIP2-City.mmdb",
            1,
        )
        .unwrap();
        assert!(matches!(source, Source::RemoteArchive(_)));
        assert!(source.describe().starts_with("MaxMind GeoIP2-City"));
    }

    #[test]
    fn test_from_resolved_object_store() {
        let source = Source::from_resolved(
            ResolvedSource::ObjectStore(ObjectStoreCredentials {
                bucket: "bucket".to_string(),
                key: "GeoIP2-City.mmdb".to_string(),
                access_key_id: "id".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
                region: "us-east-1".to_string(),
                endpoint: None,
            }),
            reqwest::Client::new(),
            "GeoIP2-City.mmdb",
            1,
        )
        .unwrap();
        assert!(matches!(source, Source::ObjectStore(_)));
        assert_eq!(source.describe(), "object store s3://bucket/GeoIP2-City.mmdb");
    }
}
