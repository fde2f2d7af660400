//! Timestamped snapshot cache.
//!
//! Snapshots of the GeoIP database live in a cache directory as
//! `{prefix}_{zero-padded epoch seconds}` files. The newest snapshot is found
//! by listing the directory, so the file names are the only persisted state.

mod naming;
mod store;

// Re-export public API
pub use naming::{extract_timestamp, snapshot_file_name};
pub use store::{SnapshotHandle, SnapshotStore};
