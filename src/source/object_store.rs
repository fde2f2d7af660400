//! S3-compatible object store source.

use anyhow::{Context, Result};
use chrono::Utc;
use url::Url;

use crate::config::ObjectStoreCredentials;
use crate::error_handling::{GeoError, GeoResult};

use super::download::download_with_retries;
use super::sigv4::{sign_get, uri_encode, SigningParams};
use super::SnapshotSource;

/// Fetches one object holding the raw database from a bucket.
///
/// Uses path-style addressing (`{endpoint}/{bucket}/{key}`) so custom
/// endpoints such as MinIO work unchanged.
#[derive(Clone)]
pub struct ObjectStoreSource {
    client: reqwest::Client,
    credentials: ObjectStoreCredentials,
    url: Url,
    max_attempts: usize,
}

impl ObjectStoreSource {
    /// # Errors
    ///
    /// `GeoError::Config` if the endpoint does not form a valid URL.
    pub fn new(
        client: reqwest::Client,
        credentials: ObjectStoreCredentials,
        max_attempts: usize,
    ) -> GeoResult<Self> {
        let endpoint = credentials
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", credentials.region));
        let raw = format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            uri_encode(&credentials.bucket, true),
            uri_encode(&credentials.key, false)
        );
        let url = Url::parse(&raw).map_err(|e| {
            GeoError::Config(format!("invalid object store endpoint {}: {}", endpoint, e))
        })?;

        Ok(Self {
            client,
            credentials,
            url,
            max_attempts,
        })
    }

    /// Object URL (no credentials in it).
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn signed_request(&self) -> reqwest::RequestBuilder {
        let params = SigningParams {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            session_token: self.credentials.session_token.as_deref(),
            region: &self.credentials.region,
            service: "s3",
        };
        let mut request = self.client.get(self.url.clone());
        for (name, value) in sign_get(&self.url, &params, Utc::now()) {
            request = request.header(name, value);
        }
        request
    }

    async fn fetch_object(&self) -> Result<Vec<u8>> {
        log::info!(
            "Fetching s3://{}/{} from {}",
            self.credentials.bucket,
            self.credentials.key,
            self.url
        );
        let bytes = download_with_retries(&self.credentials.key, self.max_attempts, || {
            self.signed_request()
        })
        .await
        .with_context(|| {
            format!(
                "Failed to fetch s3://{}/{}",
                self.credentials.bucket, self.credentials.key
            )
        })?;
        log::info!("Fetched {} bytes from object store", bytes.len());
        Ok(bytes)
    }
}

impl SnapshotSource for ObjectStoreSource {
    async fn fetch(&self) -> GeoResult<Vec<u8>> {
        self.fetch_object().await.map_err(GeoError::Fetch)
    }

    fn describe(&self) -> String {
        format!(
            "object store s3://{}/{}",
            self.credentials.bucket, self.credentials.key
        )
    }
}
