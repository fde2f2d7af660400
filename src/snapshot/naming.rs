//! Snapshot file naming.
//!
//! Snapshot files are named `{prefix}_{epoch_seconds}` with the timestamp
//! zero-padded to a fixed width, so the lexicographically greatest name in a
//! directory is also the newest snapshot.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SNAPSHOT_TIMESTAMP_WIDTH;

/// Trailing run of decimal digits.
static TRAILING_DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]+$").expect("trailing digits pattern is valid")
});

/// Builds the file name of a snapshot taken at `timestamp`.
pub fn snapshot_file_name(prefix: &str, timestamp: u64) -> String {
    format!(
        "{}_{:0width$}",
        prefix,
        timestamp,
        width = SNAPSHOT_TIMESTAMP_WIDTH
    )
}

/// Parses the creation timestamp encoded at the end of a snapshot name.
///
/// Returns 0 when there is no name, no trailing digits, or the digits do not
/// fit in a `u64`. A zero timestamp reads as "never refreshed", which forces a
/// refresh on the next staleness check.
pub fn extract_timestamp(file_name: Option<&str>) -> u64 {
    file_name
        .and_then(|name| TRAILING_DIGITS.find(name))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}
