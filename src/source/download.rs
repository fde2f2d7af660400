//! Snapshot downloads with size limits and retries.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

use crate::config::{MAX_GEOIP_DOWNLOAD_SIZE, RETRY_BACKOFF_BASE_MS, RETRY_FACTOR, RETRY_MAX_DELAY_SECS};

/// Why a single download attempt failed.
#[derive(Error, Debug)]
pub(crate) enum DownloadError {
    #[error("server answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("download too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: usize },

    #[error(transparent)]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for DownloadError {
    // Download URLs can carry license keys; keep them out of error messages.
    fn from(e: reqwest::Error) -> Self {
        DownloadError::Transport(e.without_url())
    }
}

impl DownloadError {
    /// Transient failures worth another attempt: timeouts, connection
    /// failures, 429 and 5xx answers.
    fn is_retriable(&self) -> bool {
        match self {
            DownloadError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            DownloadError::TooLarge { .. } => false,
            DownloadError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        }
    }
}

/// Retry delays for `attempts` total attempts: 2s, 4s, 8s... capped.
fn retry_strategy(attempts: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(RETRY_BACKOFF_BASE_MS)
        .factor(RETRY_FACTOR)
        .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
        .take(attempts.saturating_sub(1))
}

/// Sends the request built by `make_request`, retrying transient failures.
///
/// `make_request` runs once per attempt so signed requests get a fresh
/// signature each time.
pub(crate) async fn download_with_retries<F>(
    what: &str,
    attempts: usize,
    make_request: F,
) -> Result<Vec<u8>, DownloadError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0usize;
    RetryIf::spawn(
        retry_strategy(attempts),
        || {
            attempt += 1;
            log::debug!("Downloading {} (attempt {}/{})", what, attempt, attempts.max(1));
            download_with_size_limit(make_request(), MAX_GEOIP_DOWNLOAD_SIZE)
        },
        |e: &DownloadError| {
            let retry = e.is_retriable();
            if retry {
                log::warn!("Failed to download {}: {}; retrying", what, e);
            }
            retry
        },
    )
    .await
}

/// Downloads a response body of at most `max_size` bytes.
pub(crate) async fn download_with_size_limit(
    request: reqwest::RequestBuilder,
    max_size: usize,
) -> Result<Vec<u8>, DownloadError> {
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "No error details".to_string());
        return Err(DownloadError::Status {
            status,
            body: body.chars().take(512).collect(),
        });
    }

    // Check content-length header if available
    if let Some(content_length) = response.content_length() {
        if content_length > max_size as u64 {
            return Err(DownloadError::TooLarge {
                size: content_length,
                max: max_size,
            });
        }
    }

    let bytes = response.bytes().await?.to_vec();

    // Double-check size after download (content-length may be missing or wrong)
    if bytes.len() > max_size {
        return Err(DownloadError::TooLarge {
            size: bytes.len() as u64,
            max: max_size,
        });
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};

    #[test]
    fn test_retry_strategy_attempt_count() {
        assert_eq!(retry_strategy(1).count(), 0);
        assert_eq!(retry_strategy(3).count(), 2);
        assert_eq!(retry_strategy(0).count(), 0);
    }

    #[test]
    fn test_retry_strategy_delays_grow() {
        let delays: Vec<Duration> = retry_strategy(4).collect();
        assert_eq!(delays[0], Duration::from_secs(2));
        assert_eq!(delays[1], Duration::from_secs(4));
        assert_eq!(delays[2], Duration::from_secs(8));
    }

    #[test]
    fn test_status_retriability() {
        let retriable = DownloadError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        let throttled = DownloadError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let permanent = DownloadError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(retriable.is_retriable());
        assert!(throttled.is_retriable());
        assert!(!permanent.is_retriable());
        assert!(!DownloadError::TooLarge { size: 1, max: 0 }.is_retriable());
    }

    #[tokio::test]
    async fn test_download_success() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/db"))
                .respond_with(status_code(200).body("database bytes")),
        );

        let client = reqwest::Client::new();
        let url = server.url("/db").to_string();
        let bytes = download_with_retries("test database", 1, || client.get(&url))
            .await
            .expect("download should succeed");
        assert_eq!(bytes, b"database bytes");
    }

    #[tokio::test]
    async fn test_download_http_error_response() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/db"))
                .respond_with(status_code(500).body("boom")),
        );

        let client = reqwest::Client::new();
        let url = server.url("/db").to_string();
        let err = download_with_retries("test database", 1, || client.get(&url))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"), "got: {}", msg);
        assert!(msg.contains("boom"), "got: {}", msg);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = Server::run();
        // Exactly one request: a 401 must not be retried
        server.expect(
            Expectation::matching(request::method_path("GET", "/db"))
                .times(1)
                .respond_with(status_code(401)),
        );

        let client = reqwest::Client::new();
        let url = server.url("/db").to_string();
        let result = download_with_retries("test database", 3, || client.get(&url)).await;
        assert!(matches!(
            result,
            Err(DownloadError::Status { status, .. }) if status == StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn test_download_size_exceeded() {
        let server = Server::run();
        let large_body = vec![0u8; 1025];
        server.expect(
            Expectation::matching(request::method_path("GET", "/db"))
                .respond_with(status_code(200).body(large_body)),
        );

        let client = reqwest::Client::new();
        let url = server.url("/db").to_string();
        let err = download_with_size_limit(client.get(&url), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::TooLarge { .. }), "got: {}", err);
    }
}
