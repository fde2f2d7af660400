//! Self-refreshing GeoIP reader.
//!
//! A [`GeoReader`] owns one active database and the snapshot family it came
//! from. Every query first checks the age of the active snapshot; a stale one
//! is replaced inline, on the calling task, before the query runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use super::address::IpInput;
use super::database::{GeoDatabase, MaxMindDatabase};
use super::types::{AsnRecord, CityRecord, CountryRecord, DatabaseMetadata};
use crate::config::{GeoReaderConfig, RetentionPolicy};
use crate::error_handling::{GeoError, GeoResult};
use crate::initialization::init_client;
use crate::policy::{Clock, RefreshPolicy, SystemClock};
use crate::snapshot::{SnapshotHandle, SnapshotStore};
use crate::source::{SnapshotSource, Source};

/// Sets a busy flag for as long as the guard lives.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// GeoIP lookups over a locally cached, periodically refreshed snapshot.
///
/// # Examples
///
/// ```no_run
/// use geoip_refresh::{GeoReader, GeoReaderConfig, SourceConfig};
///
/// # async fn run() -> Result<(), geoip_refresh::GeoError> {
/// let reader = GeoReader::open(GeoReaderConfig {
///     source: SourceConfig::maxmind(Some("my-license-key".to_string())),
///     ..Default::default()
/// })
/// .await?;
///
/// let record = reader.city("8.8.8.8").await?;
/// println!("{:?}", record.country_code);
/// # Ok(())
/// # }
/// ```
pub struct GeoReader<D = MaxMindDatabase, S = Source> {
    store: SnapshotStore,
    source: S,
    policy: RefreshPolicy,
    retention: RetentionPolicy,
    clock: Arc<dyn Clock>,
    active: RwLock<Arc<D>>,
    last_refresh: AtomicU64,
    busy: AtomicBool,
    refresh_lock: Mutex<()>,
}

impl GeoReader<MaxMindDatabase, Source> {
    /// Resolves `config`, then loads or fetches the current snapshot.
    ///
    /// # Errors
    ///
    /// - `GeoError::Config` for missing or contradictory credentials
    /// - `GeoError::Storage` if the cache directory is unusable
    /// - `GeoError::Fetch` / `GeoError::InvalidDatabase` if the initial
    ///   refresh fails
    pub async fn open(config: GeoReaderConfig) -> GeoResult<Self> {
        let resolved = config.resolve_source()?;
        let client = init_client(config.download_timeout)
            .map_err(|e| GeoError::Config(e.to_string()))?;
        let source = Source::from_resolved(
            resolved,
            client,
            &config.database_prefix,
            config.max_download_attempts,
        )?;
        let store = SnapshotStore::new(config.cache_dir(), config.database_prefix.clone());

        Self::with_parts(
            store,
            source,
            RefreshPolicy::from_days(config.refresh_days),
            config.retention,
            Arc::new(SystemClock),
        )
        .await
    }
}

impl<D: GeoDatabase, S: SnapshotSource> GeoReader<D, S> {
    /// Builds a reader from explicit collaborators.
    ///
    /// Loads the newest snapshot in `store` if it is still fresh, otherwise
    /// fetches one from `source`. A fresh snapshot that fails to open is
    /// treated like a missing one.
    pub async fn with_parts(
        store: SnapshotStore,
        source: S,
        policy: RefreshPolicy,
        retention: RetentionPolicy,
        clock: Arc<dyn Clock>,
    ) -> GeoResult<Self> {
        store.ensure_directory()?;
        let latest = store.find_latest()?;
        let cached_at = latest.as_ref().map_or(0, SnapshotHandle::created_at);
        let now = clock.now_epoch_seconds();

        let cached = match latest {
            Some(handle) if !policy.is_stale(cached_at, now) => {
                match open_database::<D>(handle.path()).await {
                    Ok(db) => {
                        log::info!("Loaded cached snapshot {}", handle.path().display());
                        Some(db)
                    }
                    Err(e) => {
                        log::warn!(
                            "Cached snapshot {} is unusable ({}), fetching a new one",
                            handle.path().display(),
                            e
                        );
                        None
                    }
                }
            }
            Some(handle) => {
                log::info!(
                    "Cached snapshot {} is stale, fetching a new one",
                    handle.path().display()
                );
                None
            }
            None => {
                log::info!("No cached snapshot in {}", store.dir().display());
                None
            }
        };

        let busy = AtomicBool::new(false);
        let (db, last_refresh) = match cached {
            Some(db) => (db, cached_at),
            None => {
                run_refresh::<D, S>(&store, &source, clock.as_ref(), retention, &busy).await?
            }
        };

        Ok(Self {
            store,
            source,
            policy,
            retention,
            clock,
            active: RwLock::new(db),
            last_refresh: AtomicU64::new(last_refresh),
            busy,
            refresh_lock: Mutex::new(()),
        })
    }

    /// City-level lookup.
    ///
    /// # Errors
    ///
    /// `GeoError::Query` for malformed or unmapped addresses, plus any error
    /// from a refresh this call triggered.
    pub async fn city(&self, ip: impl Into<IpInput>) -> GeoResult<CityRecord> {
        let (db, addr) = self.prepare(ip.into()).await?;
        db.city(addr)
    }

    /// Country-level lookup.
    pub async fn country(&self, ip: impl Into<IpInput>) -> GeoResult<CountryRecord> {
        let (db, addr) = self.prepare(ip.into()).await?;
        db.country(addr)
    }

    /// Autonomous system lookup.
    pub async fn asn(&self, ip: impl Into<IpInput>) -> GeoResult<AsnRecord> {
        let (db, addr) = self.prepare(ip.into()).await?;
        db.asn(addr)
    }

    /// Metadata of the active database.
    pub async fn metadata(&self) -> GeoResult<DatabaseMetadata> {
        self.ensure_fresh().await?;
        Ok(self.active().metadata())
    }

    /// Fetches a new snapshot regardless of age.
    ///
    /// Snapshots are named by whole seconds, so a call landing in the same
    /// second as the active snapshot has nothing newer to save and returns
    /// `Ok` without fetching. On failure the active database and
    /// [`last_refresh`](Self::last_refresh) are left as they were.
    pub async fn refresh_now(&self) -> GeoResult<()> {
        let _guard = self.refresh_lock.lock().await;
        if self.clock.now_epoch_seconds() <= self.last_refresh() {
            log::info!(
                "Active GeoIP snapshot from {} is already current, skipping refresh",
                self.last_refresh()
            );
            return Ok(());
        }
        self.refresh_locked().await
    }

    /// Epoch seconds of the snapshot currently in use.
    pub fn last_refresh(&self) -> u64 {
        self.last_refresh.load(Ordering::SeqCst)
    }

    /// Epoch second after which the next query triggers a refresh.
    pub fn next_refresh_due(&self) -> u64 {
        self.policy.next_refresh_due(self.last_refresh())
    }

    /// True while a refresh is fetching, saving or opening a snapshot.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn cache_dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Newest snapshot on disk, which is normally the active one.
    pub fn current_snapshot(&self) -> GeoResult<Option<SnapshotHandle>> {
        self.store.find_latest()
    }

    async fn prepare(&self, input: IpInput) -> GeoResult<(Arc<D>, std::net::IpAddr)> {
        self.ensure_fresh().await?;
        let addr = input.normalize()?;
        Ok((self.active(), addr))
    }

    fn active(&self) -> Arc<D> {
        // The lock only guards an Arc swap, so a poisoned lock still holds a valid value
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn is_stale_now(&self) -> bool {
        self.policy
            .is_stale(self.last_refresh(), self.clock.now_epoch_seconds())
    }

    async fn ensure_fresh(&self) -> GeoResult<()> {
        if !self.is_stale_now() {
            return Ok(());
        }
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        if !self.is_stale_now() {
            return Ok(());
        }
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> GeoResult<()> {
        let (db, refreshed_at) = run_refresh::<D, S>(
            &self.store,
            &self.source,
            self.clock.as_ref(),
            self.retention,
            &self.busy,
        )
        .await?;

        *self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = db;
        self.last_refresh.store(refreshed_at, Ordering::SeqCst);
        log::info!("Active GeoIP snapshot refreshed at {}", refreshed_at);
        Ok(())
    }
}

/// Fetches, saves and opens a new snapshot, then applies retention.
///
/// Returns the opened database and the timestamp it was saved under. A saved
/// snapshot that fails to open is deleted again.
async fn run_refresh<D: GeoDatabase, S: SnapshotSource>(
    store: &SnapshotStore,
    source: &S,
    clock: &dyn Clock,
    retention: RetentionPolicy,
    busy: &AtomicBool,
) -> GeoResult<(Arc<D>, u64)> {
    let _busy = BusyGuard::set(busy);
    log::info!("Refreshing GeoIP snapshot from {}", source.describe());

    let bytes = source.fetch().await?;
    let now = clock.now_epoch_seconds();

    let save_store = store.clone();
    let handle = tokio::task::spawn_blocking(move || save_store.save(now, &bytes))
        .await
        .map_err(|e| GeoError::storage(store.dir(), std::io::Error::other(e)))??;

    let db = match open_database::<D>(handle.path()).await {
        Ok(db) => db,
        Err(e) => {
            log::warn!(
                "Discarding snapshot {} that failed to open",
                handle.path().display()
            );
            if let Err(remove_err) = store.remove(&handle) {
                log::warn!("{}", remove_err);
            }
            return Err(e);
        }
    };

    apply_retention(store, retention, &handle);
    Ok((db, now))
}

async fn open_database<D: GeoDatabase>(path: &Path) -> GeoResult<Arc<D>> {
    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || D::open(&owned))
        .await
        .map_err(|e| GeoError::InvalidDatabase {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .map(Arc::new)
}

/// Prunes superseded snapshots. Failures are logged, never returned: the
/// refresh itself already succeeded.
fn apply_retention(store: &SnapshotStore, retention: RetentionPolicy, saved: &SnapshotHandle) {
    let RetentionPolicy::KeepLatest(keep) = retention else {
        return;
    };
    match store.find_latest() {
        Ok(Some(latest)) if latest == *saved => {}
        Ok(_) => {
            // Clock went backwards: the new snapshot is not the newest file
            log::warn!(
                "Skipping snapshot pruning: {} is not the newest snapshot",
                saved.file_name()
            );
            return;
        }
        Err(e) => {
            log::warn!("Skipping snapshot pruning: {}", e);
            return;
        }
    }
    if let Err(e) = store.prune(keep) {
        log::warn!("Snapshot pruning failed: {}", e);
    }
}
