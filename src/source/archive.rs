//! MaxMind download service source.

use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use url::form_urlencoded;

use crate::error_handling::{GeoError, GeoResult};

use super::download::download_with_retries;
use super::extract::extract_member_from_tar_gz;
use super::SnapshotSource;

/// Weekday MaxMind publishes new GeoIP2 City builds on.
const RELEASE_WEEKDAY: Weekday = Weekday::Tue;

/// Most recent release day on or before `today`.
pub fn release_date(today: NaiveDate) -> NaiveDate {
    let days_back = (today.weekday().num_days_from_monday() + 7
        - RELEASE_WEEKDAY.num_days_from_monday())
        % 7;
    today - Days::new(u64::from(days_back))
}

/// Downloads a dated tar.gz release from MaxMind and extracts the database.
#[derive(Clone)]
pub struct RemoteArchiveSource {
    client: reqwest::Client,
    base_url: String,
    edition_id: String,
    license_key: String,
    member_suffix: String,
    max_attempts: usize,
}

impl RemoteArchiveSource {
    /// # Arguments
    ///
    /// * `client` - HTTP client (carries the download timeout)
    /// * `base_url` - Download endpoint, normally `MAXMIND_DOWNLOAD_BASE`
    /// * `edition_id` - Edition to fetch, e.g. "GeoIP2-City"
    /// * `license_key` - MaxMind license key
    /// * `member_suffix` - Archive member to extract, e.g. "GeoIP2-City.mmdb"
    /// * `max_attempts` - Download attempts before giving up
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        edition_id: impl Into<String>,
        license_key: impl Into<String>,
        member_suffix: impl Into<String>,
        max_attempts: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            edition_id: edition_id.into(),
            license_key: license_key.into(),
            member_suffix: member_suffix.into(),
            max_attempts,
        }
    }

    /// Download URL of the release published on `date`.
    ///
    /// Contains the license key; never log it.
    pub fn download_url(&self, date: NaiveDate) -> String {
        // URL-encode values to handle special characters in license keys
        let encode =
            |value: &str| form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>();
        format!(
            "{}?edition_id={}&date={}&suffix=tar.gz&license_key={}",
            self.base_url,
            encode(&self.edition_id),
            date.format("%Y%m%d"),
            encode(&self.license_key)
        )
    }

    async fn fetch_archive(&self) -> Result<Vec<u8>> {
        let date = release_date(Utc::now().date_naive());
        let url = self.download_url(date);
        log::info!(
            "Fetching {} release {} from {}",
            self.edition_id,
            date.format("%Y-%m-%d"),
            self.base_url
        );

        let archive = download_with_retries(&self.edition_id, self.max_attempts, || {
            self.client.get(&url)
        })
        .await
        .with_context(|| format!("Failed to download {} archive", self.edition_id))?;

        // Decompression of a full City build takes a while; keep it off the runtime threads
        let suffix = self.member_suffix.clone();
        tokio::task::spawn_blocking(move || extract_member_from_tar_gz(&archive, &suffix))
            .await
            .context("Archive extraction task failed")?
    }
}

impl SnapshotSource for RemoteArchiveSource {
    async fn fetch(&self) -> GeoResult<Vec<u8>> {
        self.fetch_archive().await.map_err(GeoError::Fetch)
    }

    fn describe(&self) -> String {
        format!("MaxMind {} via {}", self.edition_id, self.base_url)
    }
}
