//! Error type definitions.
//!
//! This module defines the error types surfaced by the snapshot cache, the
//! snapshot sources and the lookup facade.

use std::path::PathBuf;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Errors produced by [`GeoReader`](crate::GeoReader) and its collaborators.
///
/// Every error surfaces synchronously to the caller of the operation that
/// triggered it. A failed refresh never changes the active reader or the
/// recorded refresh time.
#[derive(Error, Debug)]
pub enum GeoError {
    /// Missing or contradictory configuration (usually credentials).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The cache directory is unusable or a snapshot could not be written.
    #[error("Snapshot storage error at {}: {source}", path.display())]
    Storage {
        /// Path the failing filesystem operation touched.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Fetching a fresh snapshot failed (transport, HTTP status, archive
    /// extraction or object store failure).
    #[error("Snapshot fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    /// A snapshot file exists but the database engine refused to open it.
    #[error("Invalid GeoIP database {}: {reason}", path.display())]
    InvalidDatabase {
        /// Snapshot file that failed to open.
        path: PathBuf,
        /// Reason reported by the database engine.
        reason: String,
    },

    /// The lookup was rejected (malformed address, or address not mapped).
    #[error("GeoIP lookup failed for {input}: {reason}")]
    Query {
        /// The address as supplied by the caller.
        input: String,
        /// Why the lookup failed.
        reason: String,
    },
}

impl GeoError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GeoError::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn query(input: impl ToString, reason: impl ToString) -> Self {
        GeoError::Query {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for errors raised while fetching a snapshot.
    pub fn is_fetch(&self) -> bool {
        matches!(self, GeoError::Fetch(_))
    }

    /// Returns true for lookup rejections (bad address or no data).
    pub fn is_query(&self) -> bool {
        matches!(self, GeoError::Query { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type GeoResult<T> = Result<T, GeoError>;
