//! Configuration and constants.
//!
//! This module provides:
//! - Configuration constants (intervals, naming, download limits)
//! - Library configuration and credential resolution
//! - Command-line options for the binary

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::{Command, LookupKind, Opt};
pub use constants::*;
pub use types::{
    GeoReaderConfig, LogFormat, LogLevel, ObjectStoreCredentials, ResolvedSource,
    RetentionPolicy, SourceConfig,
};
