//! Bulk cache maintenance: population and the expiry sweep.
//!
//! # Update
//!
//! [`CacheMaintainer::update`] walks a tree with the same rules as a scan and
//! stores a signature for every file. A [`UpdateMode::Full`] update always
//! re-hashes; an [`UpdateMode::Incremental`] update keeps entries that are
//! still valid. Either way the cleanup sweep runs once the walk is done.
//!
//! # Cleanup
//!
//! [`CacheMaintainer::cleanup`] runs in two passes. Pass one iterates the
//! whole store and collects the keys of entries that are older than
//! [`RETENTION`](super::RETENTION) or that fail to decode. Pass two deletes
//! the collected keys once the iteration cursor has been released.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{CacheEntry, CacheError, SignatureCache, RETENTION};
use crate::progress::{ProgressCallback, PHASE_CACHING};
use crate::scanner::{
    CachePolicy, Hasher, SignatureComputer, SignatureError, SignatureSource, Walker,
};

/// How an update treats entries that already exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Keep valid entries; hash only missing or invalidated files.
    #[default]
    Incremental,
    /// Re-hash every file and overwrite its entry.
    Full,
}

impl UpdateMode {
    fn policy(self) -> CachePolicy {
        match self {
            Self::Incremental => CachePolicy::READ_WRITE,
            Self::Full => CachePolicy::REFRESH,
        }
    }
}

/// Outcome of the cleanup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CleanupSummary {
    /// Entries examined
    pub scanned: usize,
    /// Entries past the retention window
    pub expired: usize,
    /// Entries that failed to decode
    pub malformed: usize,
    /// Entries actually deleted
    pub deleted: usize,
}

/// Outcome of a cache update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UpdateSummary {
    /// Files found by the walk
    pub files_seen: usize,
    /// Signatures computed and stored
    pub inserted: usize,
    /// Valid entries kept without re-hashing (incremental mode only)
    pub reused: usize,
    /// Files that could not be read
    pub failed: usize,
    /// Entries the walk could not inspect
    pub traversal_errors: usize,
    /// The sweep that ran after the walk
    pub cleanup: CleanupSummary,
}

impl UpdateSummary {
    /// Whether anything was skipped along the way.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failed > 0 || self.traversal_errors > 0
    }
}

/// Errors that abort a maintenance run.
#[derive(thiserror::Error, Debug)]
pub enum MaintenanceError {
    /// The cache store could not be opened or iterated.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The root to update is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(std::path::PathBuf),
}

/// Runs bulk operations against a [`SignatureCache`].
pub struct CacheMaintainer<'c> {
    cache: &'c mut SignatureCache,
    hasher: Hasher,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl<'c> CacheMaintainer<'c> {
    /// Create a maintainer over `cache`.
    #[must_use]
    pub fn new(cache: &'c mut SignatureCache) -> Self {
        Self {
            cache,
            hasher: Hasher::new(),
            progress: None,
        }
    }

    /// Use a custom hasher configuration.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Report progress while walking.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Store signatures for every file under `root`, then run the sweep.
    ///
    /// # Errors
    ///
    /// Returns [`MaintenanceError`] if `root` is not a directory or the
    /// cache cannot be opened. Unreadable files and entries are counted and
    /// skipped.
    pub fn update(&mut self, root: &Path, mode: UpdateMode) -> Result<UpdateSummary, MaintenanceError> {
        self.update_at(root, mode, Utc::now())
    }

    /// [`update`](Self::update) with an explicit clock for the sweep.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub fn update_at(
        &mut self,
        root: &Path,
        mode: UpdateMode,
        now: DateTime<Utc>,
    ) -> Result<UpdateSummary, MaintenanceError> {
        if !root.is_dir() {
            return Err(MaintenanceError::NotADirectory(root.to_path_buf()));
        }

        // Open eagerly so an unusable store fails before any hashing
        self.cache.open()?;

        log::info!("Updating cache for {} ({:?})", root.display(), mode);
        if let Some(ref progress) = self.progress {
            progress.on_phase_start(PHASE_CACHING, 0);
        }

        let mut summary = UpdateSummary::default();
        let walker = Walker::new(root);
        let mut computer =
            SignatureComputer::with_cache(self.hasher.clone(), mode.policy(), &mut *self.cache);

        for result in walker.walk() {
            let record = match result {
                Ok(record) => record,
                Err(_) => {
                    summary.traversal_errors += 1;
                    continue;
                }
            };
            summary.files_seen += 1;
            if let Some(ref progress) = self.progress {
                progress.on_progress(summary.files_seen, &record.path.to_string_lossy());
            }

            match computer.signature_with_source(&record) {
                Ok((_, SignatureSource::Cache)) => summary.reused += 1,
                Ok((_, SignatureSource::Computed)) => summary.inserted += 1,
                Err(SignatureError::Read(_)) => summary.failed += 1,
                Err(SignatureError::CacheUnavailable(e)) => return Err(e.into()),
            }
        }

        if let Some(ref progress) = self.progress {
            progress.on_phase_end(PHASE_CACHING);
        }

        log::info!(
            "Cached {} of {} files ({} reused, {} failed)",
            summary.inserted,
            summary.files_seen,
            summary.reused,
            summary.failed
        );

        summary.cleanup = self.cleanup_at(now)?;
        Ok(summary)
    }

    /// Remove expired and malformed entries from the whole cache.
    ///
    /// # Errors
    ///
    /// Returns [`MaintenanceError`] if the cache cannot be opened or iterated.
    pub fn cleanup(&mut self) -> Result<CleanupSummary, MaintenanceError> {
        self.cleanup_at(Utc::now())
    }

    /// [`cleanup`](Self::cleanup) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`cleanup`](Self::cleanup).
    pub fn cleanup_at(&mut self, now: DateTime<Utc>) -> Result<CleanupSummary, MaintenanceError> {
        let retention = chrono::Duration::seconds(i64::try_from(RETENTION.as_secs()).unwrap_or(i64::MAX));
        let mut summary = CleanupSummary::default();
        let mut doomed: Vec<String> = Vec::new();

        // Pass one: collect candidates. No mutation while the cursor is live.
        self.cache.for_each(|key, value| {
            summary.scanned += 1;
            match CacheEntry::decode(value) {
                Ok(entry) => {
                    if entry.age(now) > retention {
                        log::debug!("Expired cache entry: {} (saved {})", key, entry.saved_at);
                        summary.expired += 1;
                        doomed.push(key.to_string());
                    }
                }
                Err(reason) => {
                    log::debug!("Malformed cache entry: {}: {}", key, reason);
                    summary.malformed += 1;
                    doomed.push(key.to_string());
                }
            }
        })?;

        // Pass two: apply deletions.
        for key in &doomed {
            match self.cache.delete_key(key) {
                Ok(()) => summary.deleted += 1,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => log::warn!("Failed to delete cache entry {}: {}", key, e),
            }
        }

        log::info!(
            "Cache cleanup: {} entries scanned, {} deleted ({} expired, {} malformed)",
            summary.scanned,
            summary.deleted,
            summary.expired,
            summary.malformed
        );
        Ok(summary)
    }
}
