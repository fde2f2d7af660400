//! Error handling.
//!
//! Errors are grouped by the stage that produced them:
//! - **Config**: missing or contradictory credentials
//! - **Storage**: cache directory and snapshot file failures
//! - **Fetch**: network, archive and object store failures
//! - **Query**: the database rejected a lookup

mod types;

// Re-export public API
pub use types::{GeoError, GeoResult, InitializationError};
