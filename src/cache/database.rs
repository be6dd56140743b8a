//! SQLite-backed signature cache.
//!
//! The store is a single key/value table mapping a file path to an encoded
//! [`CacheEntry`]. The connection is opened lazily on first use and held
//! for the lifetime of the [`SignatureCache`].

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::entry::{CacheEntry, DecodeError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS signatures (
    path  TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)";

/// Errors raised by the signature cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The backing store could not be opened or created. Fatal.
    #[error("failed to open cache file {path}: {source}")]
    Open {
        /// Location of the store
        path: PathBuf,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A single fetch/store/delete/iterate call failed.
    #[error("cache backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    /// A stored value could not be decoded.
    #[error("malformed cache entry for '{key}': {reason}")]
    Malformed {
        /// Key of the offending entry
        key: String,
        /// Why decoding failed
        reason: DecodeError,
    },

    /// An entry could not be serialized.
    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CacheError {
    /// Whether this error means the cache is unusable for the rest of the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Process-lifetime cache counters.
///
/// Only used for reporting; never consulted for correctness decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStatistics {
    /// Calls to [`SignatureCache::get`]
    pub lookups: u64,
    /// Lookups that returned a usable entry
    pub hits: u64,
    /// Entries deleted because the file size changed
    pub invalidations: u64,
    /// Entries that could not be decoded
    pub malformed: u64,
    /// Entries written
    pub writes: u64,
}

impl CacheStatistics {
    /// Lookups that did not produce a usable entry.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.lookups.saturating_sub(self.hits)
    }

    /// Hit ratio in the range `0.0..=1.0`.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

impl std::fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} lookups, {} hits ({:.1}%), {} invalidated, {} malformed, {} writes",
            self.lookups,
            self.hits,
            self.hit_ratio() * 100.0,
            self.invalidations,
            self.malformed,
            self.writes
        )
    }
}

enum Location {
    File(PathBuf),
    Memory,
}

/// Persistent mapping from file path to [`CacheEntry`].
///
/// # Example
///
/// ```no_run
/// use find_dups::cache::SignatureCache;
/// use std::path::Path;
///
/// let mut cache = SignatureCache::new("/tmp/find_dups.cache");
/// cache.put(Path::new("/data/a.bin"), "ab12", 4).unwrap();
/// assert!(cache.get(Path::new("/data/a.bin"), 4).unwrap().is_some());
/// cache.close().unwrap();
/// ```
pub struct SignatureCache {
    location: Location,
    conn: Option<Connection>,
    stats: CacheStatistics,
}

impl std::fmt::Debug for SignatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = match &self.location {
            Location::File(path) => path.display().to_string(),
            Location::Memory => ":memory:".to_string(),
        };
        f.debug_struct("SignatureCache")
            .field("location", &location)
            .field("open", &self.conn.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl SignatureCache {
    /// Create a cache backed by the file at `path`.
    ///
    /// Nothing is opened until the first operation touches the store.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: None,
            stats: CacheStatistics::default(),
        }
    }

    /// Create a cache backed by a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: None,
            stats: CacheStatistics::default(),
        }
    }

    /// Path of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Whether the store has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Counters accumulated since construction.
    #[must_use]
    pub fn stats(&self) -> CacheStatistics {
        self.stats
    }

    /// Open the store now instead of on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Open`] if the store cannot be opened or created.
    pub fn open(&mut self) -> CacheResult<()> {
        self.connection().map(|_| ())
    }

    /// Release the store handle. The next operation reopens it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Backend`] if SQLite fails to close cleanly.
    pub fn close(&mut self) -> CacheResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| CacheError::Backend(e))?;
            log::debug!("Signature cache closed");
        }
        Ok(())
    }

    fn connection(&mut self) -> CacheResult<&Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open_connection()?,
        };
        Ok(self.conn.insert(conn))
    }

    fn open_connection(&self) -> CacheResult<Connection> {
        let (conn, path) = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        log::warn!("Failed to create cache directory {}: {}", parent.display(), e);
                    }
                }
                (Connection::open(path), path.clone())
            }
            Location::Memory => (Connection::open_in_memory(), PathBuf::from(":memory:")),
        };

        let conn = conn.map_err(|source| CacheError::Open {
            path: path.clone(),
            source,
        })?;
        // Garbage files only surface as errors once SQLite reads the header
        conn.execute_batch(SCHEMA)
            .map_err(|source| CacheError::Open {
                path: path.clone(),
                source,
            })?;

        log::debug!("Signature cache opened at {}", path.display());
        Ok(conn)
    }

    /// Look up the entry for `path`, validating it against `current_size`.
    ///
    /// Returns `Ok(None)` if there is no entry. If the stored size differs
    /// from `current_size` the entry is deleted and `Ok(None)` is returned.
    /// A value that cannot be decoded is deleted as well.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Open`] if the store cannot be opened (fatal)
    /// - [`CacheError::Backend`] if the fetch fails
    /// - [`CacheError::Malformed`] if the stored value cannot be decoded
    pub fn get(&mut self, path: &Path, current_size: u64) -> CacheResult<Option<CacheEntry>> {
        self.stats.lookups += 1;
        let Some(key) = cache_key(path) else {
            log::debug!("Cache bypassed for non-UTF-8 path {}", path.display());
            return Ok(None);
        };

        let Some(raw) = self.fetch_raw(&key)? else {
            log::trace!("Cache miss: {}", key);
            return Ok(None);
        };

        let entry = match CacheEntry::decode(&raw) {
            Ok(entry) => entry,
            Err(reason) => {
                self.stats.malformed += 1;
                self.delete_key(&key)?;
                return Err(CacheError::Malformed { key, reason });
            }
        };

        if !entry.matches_size(current_size) {
            log::debug!(
                "Cache entry for {} invalidated: size {} -> {}",
                key,
                entry.size,
                current_size
            );
            self.stats.invalidations += 1;
            self.delete_key(&key)?;
            return Ok(None);
        }

        self.stats.hits += 1;
        log::trace!("Cache hit: {} -> {}", key, entry.signature);
        Ok(Some(entry))
    }

    /// Store `signature` for `path`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the store cannot be opened or written.
    pub fn put(&mut self, path: &Path, signature: &str, size: u64) -> CacheResult<()> {
        self.insert(path, &CacheEntry::new(signature, size))
    }

    /// Store `entry` for `path` as given, overwriting any prior entry.
    /// Paths without a [`cache_key`] are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the store cannot be opened or written.
    pub fn insert(&mut self, path: &Path, entry: &CacheEntry) -> CacheResult<()> {
        let Some(key) = cache_key(path) else {
            log::debug!("Not caching non-UTF-8 path {}", path.display());
            return Ok(());
        };
        let value = entry.encode()?;
        self.connection()?.execute(
            "INSERT OR REPLACE INTO signatures (path, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        self.stats.writes += 1;
        log::trace!("Cache write: {} -> {}", key, entry.signature);
        Ok(())
    }

    /// Remove the entry for `path`. A no-op if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the store cannot be opened or written.
    pub fn delete(&mut self, path: &Path) -> CacheResult<()> {
        match cache_key(path) {
            Some(key) => self.delete_key(&key),
            None => Ok(()),
        }
    }

    /// Remove the entry stored under the raw `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the store cannot be opened or written.
    pub fn delete_key(&mut self, key: &str) -> CacheResult<()> {
        self.connection()?
            .execute("DELETE FROM signatures WHERE path = ?1", params![key])?;
        Ok(())
    }

    /// Visit every stored key with its raw value.
    ///
    /// The cursor is finished and released before this returns, so callers
    /// that want to delete entries must collect keys during the visit and
    /// delete them afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the store cannot be opened or iteration
    /// fails. A row that cannot be read is logged and skipped.
    pub fn for_each<F>(&mut self, mut visit: F) -> CacheResult<()>
    where
        F: FnMut(&str, &str),
    {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT path, value FROM signatures ORDER BY path")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            match row {
                Ok((key, value)) => visit(&key, &value),
                Err(e) => log::warn!("Skipping unreadable cache row: {}", e),
            }
        }
        Ok(())
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the store cannot be opened or queried.
    pub fn len(&mut self) -> CacheResult<usize> {
        let count: i64 =
            self.connection()?
                .query_row("SELECT COUNT(*) FROM signatures", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether the store holds no entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the store cannot be opened or queried.
    pub fn is_empty(&mut self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    fn fetch_raw(&mut self, key: &str) -> CacheResult<Option<String>> {
        let value = self
            .connection()?
            .query_row(
                "SELECT value FROM signatures WHERE path = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    #[cfg(test)]
    pub(crate) fn store_raw(&mut self, key: &str, value: &str) -> CacheResult<()> {
        self.connection()?.execute(
            "INSERT OR REPLACE INTO signatures (path, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Key under which the entry for `path` is stored.
///
/// Paths that are not valid UTF-8 have no key and are never cached. A lossy
/// conversion would map distinct names onto the same key.
#[must_use]
pub fn cache_key(path: &Path) -> Option<String> {
    path.to_str().map(str::to_owned)
}
