//! Signature caching module.
//!
//! This module provides persistent storage for content signatures so that
//! repeated scans can skip re-reading unchanged files.
//!
//! # Architecture
//!
//! * [`database`]: SQLite persistence, lookups, writes and full iteration.
//! * [`entry`]: The stored record and its versioned encoding.
//! * [`maintenance`]: Bulk population of the cache and the expiry sweep.
//!
//! # Cache Invalidation
//!
//! Lookups validate an entry only against the current file size. A size
//! mismatch deletes the entry on the spot. Entry age is checked only by the
//! maintenance sweep, which removes anything older than [`RETENTION`] along
//! with any value that fails to decode.

pub mod database;
pub mod entry;
pub mod maintenance;

pub use database::{cache_key, CacheError, CacheResult, CacheStatistics, SignatureCache};
pub use entry::{CacheEntry, DecodeError, RECORD_VERSION};
pub use maintenance::{CacheMaintainer, CleanupSummary, UpdateMode, UpdateSummary};

use std::path::PathBuf;

/// Entries older than this are removed by the cleanup sweep (90 days).
pub const RETENTION: std::time::Duration = std::time::Duration::from_secs(2160 * 60 * 60);

/// File name of the cache in the user's home directory.
pub const DEFAULT_CACHE_FILE_NAME: &str = ".find_dups.cache";

/// Default cache location: `~/.find_dups.cache`.
///
/// Falls back to the current directory when no home directory can be
/// determined.
#[must_use]
pub fn default_cache_path() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(DEFAULT_CACHE_FILE_NAME),
        None => {
            log::warn!("Could not determine home directory, using current directory for cache");
            PathBuf::from(DEFAULT_CACHE_FILE_NAME)
        }
    }
}
