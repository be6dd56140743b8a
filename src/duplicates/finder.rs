//! Duplicate finder implementation.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Walk**: collect every regular file under the root
//! 2. **Size grouping**: bucket files by exact size (see [`crate::duplicates::groups`])
//! 3. **Signatures**: for buckets of 2+ files, compute or look up each
//!    file's content signature and bucket by `(signature, size)`
//! 4. **Report**: keep buckets of 2+ files, largest size first
//!
//! Everything runs on the calling thread.
//!
//! # Example
//!
//! ```no_run
//! use find_dups::cache::SignatureCache;
//! use find_dups::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let mut cache = SignatureCache::new("/tmp/find_dups.cache");
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let (groups, summary) = finder
//!     .find_duplicates(Path::new("."), Some(&mut cache))
//!     .unwrap();
//!
//! println!("{} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::groups::{SignatureBucketIndex, SignatureKey, SizeBucketIndex};
use super::report::{DuplicateGroup, DuplicateReporter};
use crate::cache::{CacheError, CacheStatistics, SignatureCache};
use crate::progress::{ProgressCallback, PHASE_HASHING, PHASE_WALKING};
use crate::scanner::{
    CachePolicy, Hasher, SignatureComputer, SignatureError, SignatureSource, Walker,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// How a supplied cache is used. Ignored when no cache is passed.
    pub cache_policy: CachePolicy,
    /// Content hasher settings.
    pub hasher: Hasher,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("cache_policy", &self.cache_policy)
            .field("hasher", &self.hasher)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::READ_WRITE,
            hasher: Hasher::new(),
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the cache policy.
    #[must_use]
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// Set the hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of files found by the walk
    pub total_files: usize,
    /// Total size of all files found in bytes
    pub total_size: u64,
    /// Files dropped because no other file has their size
    pub eliminated_by_size: usize,
    /// Files whose signature was computed or looked up
    pub files_hashed: usize,
    /// Signatures served from the cache
    pub cache_hits: usize,
    /// Files dropped because they could not be read
    pub read_failures: usize,
    /// Entries the walk could not inspect
    pub traversal_errors: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding originals)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Cache counters at the end of the scan, when a cache was used
    pub cache_stats: Option<CacheStatistics>,
}

impl ScanSummary {
    /// Whether some files or entries were skipped.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.read_failures > 0 || self.traversal_errors > 0
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The signature cache could not be opened.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Duplicate finder that runs the detection pipeline.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Find all duplicate files under `path`.
    ///
    /// When `cache` is given it is used according to the configured
    /// [`CachePolicy`]; it is opened before the walk so that an unusable
    /// store fails fast.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist
    /// - The path is not a directory
    /// - The cache store cannot be opened
    ///
    /// Unreadable entries and files are skipped and counted in the summary.
    pub fn find_duplicates(
        &self,
        path: &Path,
        mut cache: Option<&mut SignatureCache>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();

        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }

        let policy = if cache.is_some() {
            self.config.cache_policy
        } else {
            CachePolicy::DISABLED
        };
        if policy.uses_cache() {
            if let Some(cache) = cache.as_deref_mut() {
                cache.open()?;
            }
        }

        log::info!("Starting duplicate scan of {}", path.display());

        // Walk and size grouping
        let progress = self.config.progress_callback.as_ref();
        if let Some(callback) = progress {
            callback.on_phase_start(PHASE_WALKING, 0);
        }

        let mut sizes = SizeBucketIndex::new();
        let mut walked = 0usize;
        for result in Walker::new(path).walk() {
            match result {
                Ok(record) => {
                    walked += 1;
                    if let Some(callback) = progress {
                        callback.on_progress(walked, &record.path.to_string_lossy());
                    }
                    sizes.add(record);
                }
                Err(_) => summary.traversal_errors += 1,
            }
        }

        if let Some(callback) = progress {
            callback.on_phase_end(PHASE_WALKING);
        }

        let size_stats = sizes.stats();
        summary.total_files = size_stats.total_files;
        summary.total_size = size_stats.total_size;
        summary.eliminated_by_size = size_stats.eliminated_unique;

        log::info!(
            "Found {} files ({} total)",
            summary.total_files,
            ByteSize::b(summary.total_size)
        );
        log::info!(
            "Size grouping: {} files -> {} candidates ({:.1}% eliminated)",
            size_stats.total_files,
            size_stats.potential_duplicates,
            size_stats.elimination_rate()
        );

        // Signatures for every candidate
        let mut computer = match (policy.uses_cache(), cache.as_deref_mut()) {
            (true, Some(cache)) => {
                SignatureComputer::with_cache(self.config.hasher.clone(), policy, cache)
            }
            _ => SignatureComputer::uncached(self.config.hasher.clone()),
        };

        if let Some(callback) = progress {
            callback.on_phase_start(PHASE_HASHING, size_stats.potential_duplicates);
        }

        let mut signatures = SignatureBucketIndex::new();
        for bucket in sizes.into_buckets() {
            if !bucket.has_duplicates() {
                log::trace!(
                    "Skipping unique size {}: {}",
                    bucket.size,
                    bucket.files[0].path.display()
                );
                continue;
            }

            for record in bucket.files {
                summary.files_hashed += 1;
                if let Some(callback) = progress {
                    callback.on_progress(summary.files_hashed, &record.path.to_string_lossy());
                }

                match computer.signature_with_source(&record) {
                    Ok((signature, source)) => {
                        if source == SignatureSource::Cache {
                            summary.cache_hits += 1;
                        }
                        signatures.add(SignatureKey::new(signature, record.size), record);
                    }
                    Err(SignatureError::Read(_)) => summary.read_failures += 1,
                    Err(SignatureError::CacheUnavailable(e)) => return Err(e.into()),
                }
            }
        }

        if let Some(callback) = progress {
            callback.on_phase_end(PHASE_HASHING);
        }
        drop(computer);

        let groups = DuplicateReporter::report(signatures.into_buckets());

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        summary.reclaimable_space = DuplicateReporter::reclaimable_space(&groups);
        summary.cache_stats = cache
            .as_deref()
            .filter(|_| policy.uses_cache())
            .map(SignatureCache::stats);
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} reclaimable ({} read failures, {} traversal errors)",
            summary.duplicate_groups,
            summary.reclaimable_display(),
            summary.read_failures,
            summary.traversal_errors
        );

        Ok((groups, summary))
    }
}
