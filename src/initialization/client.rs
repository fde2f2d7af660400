//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::DEFAULT_USER_AGENT;
use crate::error_handling::InitializationError;

/// Initializes the HTTP client used for snapshot downloads.
///
/// Creates a `reqwest::Client` configured with:
/// - the crate User-Agent
/// - a per-request timeout (whole request, including the body)
/// - redirect following (MaxMind answers with a redirect to its CDN)
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(timeout: Duration) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(30)))
        .user_agent(DEFAULT_USER_AGENT)
        .build()?;
    Ok(client)
}
