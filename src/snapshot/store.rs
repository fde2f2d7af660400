//! On-disk snapshot cache.
//!
//! The cache directory holds zero or more snapshot files sharing a prefix.
//! Nothing is kept in memory: every discovery call lists the directory
//! afresh, so manually copied or restored snapshots are picked up as-is.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error_handling::{GeoError, GeoResult};

use super::naming::{extract_timestamp, snapshot_file_name};

/// A snapshot file in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    path: PathBuf,
    file_name: String,
}

impl SnapshotHandle {
    fn new(path: PathBuf, file_name: String) -> Self {
        Self { path, file_name }
    }

    /// Full path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name (prefix plus timestamp suffix).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Creation time encoded in the file name, 0 if none is encoded.
    pub fn created_at(&self) -> u64 {
        extract_timestamp(Some(&self.file_name))
    }
}

/// Manages one snapshot family (prefix) inside one cache directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    prefix: String,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The snapshot family prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Creates the cache directory if it is missing.
    ///
    /// # Errors
    ///
    /// `GeoError::Storage` if the directory cannot be created or the path
    /// exists but is not a directory.
    pub fn ensure_directory(&self) -> GeoResult<()> {
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(GeoError::storage(
                &self.dir,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "path exists but is not a directory",
                ),
            ));
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| GeoError::storage(&self.dir, e))?;
        Ok(())
    }

    /// Lists every snapshot of this family, oldest first.
    pub fn list(&self) -> GeoResult<Vec<SnapshotHandle>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| GeoError::storage(&self.dir, e))?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| GeoError::storage(&self.dir, e))?;
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                log::debug!("Skipping non UTF-8 cache entry: {:?}", entry.file_name());
                continue;
            };
            if !file_name.starts_with(&self.prefix) {
                continue;
            }
            // Follows symlinks; a dangling link is skipped
            let is_file = std::fs::metadata(entry.path())
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            snapshots.push(SnapshotHandle::new(entry.path(), file_name));
        }

        snapshots.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(snapshots)
    }

    /// Returns the current snapshot: the one whose name sorts greatest.
    ///
    /// Timestamps are fixed-width and zero-padded, so the greatest name is the
    /// newest snapshot.
    pub fn find_latest(&self) -> GeoResult<Option<SnapshotHandle>> {
        let latest = self.list()?.pop();
        match &latest {
            Some(handle) => log::debug!("Latest cached snapshot: {}", handle.path.display()),
            None => log::debug!(
                "No cached snapshot with prefix {} in {}",
                self.prefix,
                self.dir.display()
            ),
        }
        Ok(latest)
    }

    /// Writes `bytes` as a new snapshot taken at `timestamp`.
    ///
    /// The bytes go to a hidden temporary file first and are published under
    /// the final name only once fully written and synced, so an interrupted
    /// save never leaves a truncated snapshot behind. An existing snapshot is
    /// never overwritten.
    ///
    /// # Errors
    ///
    /// `GeoError::Storage` on any write failure, or if a snapshot with the
    /// same timestamp already exists.
    pub fn save(&self, timestamp: u64, bytes: &[u8]) -> GeoResult<SnapshotHandle> {
        let file_name = snapshot_file_name(&self.prefix, timestamp);
        let final_path = self.dir.join(&file_name);

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.prefix))
            .suffix(".partial")
            .tempfile_in(&self.dir)
            .map_err(|e| GeoError::storage(&self.dir, e))?;

        tmp.write_all(bytes)
            .map_err(|e| GeoError::storage(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| GeoError::storage(tmp.path(), e))?;

        // The temp file is removed on drop if publishing fails.
        tmp.persist_noclobber(&final_path)
            .map_err(|e| GeoError::storage(&final_path, e.error))?;

        log::info!(
            "Saved snapshot {} ({} bytes)",
            final_path.display(),
            bytes.len()
        );
        Ok(SnapshotHandle::new(final_path, file_name))
    }

    /// Deletes one snapshot file.
    pub fn remove(&self, handle: &SnapshotHandle) -> GeoResult<()> {
        std::fs::remove_file(&handle.path).map_err(|e| GeoError::storage(&handle.path, e))
    }

    /// Deletes all but the newest `keep` snapshots and returns what was removed.
    ///
    /// At least one snapshot is always kept.
    pub fn prune(&self, keep: usize) -> GeoResult<Vec<SnapshotHandle>> {
        let keep = keep.max(1);
        let mut snapshots = self.list()?;
        if snapshots.len() <= keep {
            return Ok(Vec::new());
        }

        let stale: Vec<SnapshotHandle> = snapshots.drain(..snapshots.len() - keep).collect();
        for handle in &stale {
            self.remove(handle)?;
            log::info!("Pruned superseded snapshot {}", handle.path.display());
        }
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PREFIX: &str = "GeoIP2-City.mmdb";

    fn store_in(temp_dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(temp_dir.path(), PREFIX)
    }

    #[test]
    fn test_ensure_directory_creates_missing_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SnapshotStore::new(temp_dir.path().join("nested").join("cache"), PREFIX);

        store.ensure_directory().expect("directory should be created");
        assert!(store.dir().is_dir());

        // Idempotent on an existing directory
        store.ensure_directory().expect("existing directory is fine");
    }

    #[test]
    fn test_ensure_directory_rejects_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file_path = temp_dir.path().join("not_a_dir");
        std::fs::write(&file_path, b"x").expect("Failed to write file");

        let store = SnapshotStore::new(&file_path, PREFIX);
        let err = store.ensure_directory().unwrap_err();
        assert!(matches!(err, GeoError::Storage { .. }), "got: {}", err);
    }

    #[test]
    fn test_find_latest_empty_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);
        assert!(store.find_latest().unwrap().is_none());
    }

    #[test]
    fn test_find_latest_picks_greatest_timestamp() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);

        for ts in [1_600_000_000u64, 999_999_999, 1_700_000_000, 1_650_000_000] {
            std::fs::write(temp_dir.path().join(snapshot_file_name(PREFIX, ts)), b"db")
                .expect("Failed to write snapshot");
        }

        let latest = store.find_latest().unwrap().expect("snapshot expected");
        assert_eq!(latest.created_at(), 1_700_000_000);
        assert_eq!(latest.file_name(), "GeoIP2-City.mmdb_01700000000");
    }

    #[test]
    fn test_find_latest_ignores_other_prefixes_and_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);

        std::fs::write(
            temp_dir.path().join(snapshot_file_name("GeoIP2-ASN.mmdb", 1_900_000_000)),
            b"asn",
        )
        .unwrap();
        std::fs::create_dir(temp_dir.path().join(snapshot_file_name(PREFIX, 1_800_000_000)))
            .unwrap();
        std::fs::write(
            temp_dir.path().join(snapshot_file_name(PREFIX, 1_500_000_000)),
            b"city",
        )
        .unwrap();

        let latest = store.find_latest().unwrap().expect("snapshot expected");
        assert_eq!(latest.created_at(), 1_500_000_000);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_latest_follows_symlinked_snapshot() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let restored = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);

        std::fs::write(temp_dir.path().join(snapshot_file_name(PREFIX, 1_600_000_000)), b"old")
            .unwrap();
        let target = restored.path().join("restored.mmdb");
        std::fs::write(&target, b"restored").unwrap();
        std::os::unix::fs::symlink(
            &target,
            temp_dir.path().join(snapshot_file_name(PREFIX, 1_700_000_000)),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            restored.path().join("missing.mmdb"),
            temp_dir.path().join(snapshot_file_name(PREFIX, 1_800_000_000)),
        )
        .unwrap();

        let latest = store.find_latest().unwrap().expect("snapshot expected");
        assert_eq!(latest.created_at(), 1_700_000_000);
        assert_eq!(std::fs::read(latest.path()).unwrap(), b"restored");
    }

    #[test]
    fn test_save_writes_named_snapshot() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);

        let handle = store.save(1_700_000_000, b"snapshot bytes").unwrap();
        assert_eq!(handle.file_name(), "GeoIP2-City.mmdb_01700000000");
        assert_eq!(std::fs::read(handle.path()).unwrap(), b"snapshot bytes");

        // No temp files left behind
        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["GeoIP2-City.mmdb_01700000000".to_string()]);
    }

    #[test]
    fn test_save_never_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);

        store.save(1_700_000_000, b"first").unwrap();
        let err = store.save(1_700_000_000, b"second").unwrap_err();
        assert!(matches!(err, GeoError::Storage { .. }));

        let path = temp_dir.path().join(snapshot_file_name(PREFIX, 1_700_000_000));
        assert_eq!(std::fs::read(path).unwrap(), b"first");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_save_keeps_previous_snapshots() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);

        store.save(100, b"old").unwrap();
        store.save(200, b"new").unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.find_latest().unwrap().unwrap().created_at(), 200);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SnapshotStore::new(temp_dir.path().join("missing"), PREFIX);
        let err = store.save(1, b"bytes").unwrap_err();
        assert!(matches!(err, GeoError::Storage { .. }));
    }

    #[test]
    fn test_prune_keeps_newest() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);
        for ts in [10, 20, 30, 40] {
            store.save(ts, b"db").unwrap();
        }

        let removed = store.prune(2).unwrap();
        let removed_ts: Vec<u64> = removed.iter().map(|h| h.created_at()).collect();
        assert_eq!(removed_ts, vec![10, 20]);

        let left: Vec<u64> = store.list().unwrap().iter().map(|h| h.created_at()).collect();
        assert_eq!(left, vec![30, 40]);
    }

    #[test]
    fn test_prune_zero_still_keeps_one() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);
        store.save(10, b"db").unwrap();
        store.save(20, b"db").unwrap();

        store.prune(0).unwrap();
        let left = store.list().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].created_at(), 20);
    }

    #[test]
    fn test_handle_without_digits_has_zero_timestamp() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = store_in(&temp_dir);
        std::fs::write(temp_dir.path().join(PREFIX), b"db").unwrap();

        let latest = store.find_latest().unwrap().expect("snapshot expected");
        assert_eq!(latest.created_at(), 0);
    }
}
