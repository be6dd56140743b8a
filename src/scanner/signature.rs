//! Cache-aware signature computation.
//!
//! [`SignatureComputer`] returns the content signature for a [`FileRecord`],
//! consulting and/or updating a [`SignatureCache`] according to a
//! [`CachePolicy`]. Cache problems other than a failure to open the store
//! degrade to a plain recompute; an unreadable file is an error the caller
//! must drop from grouping.

use crate::cache::{CacheError, SignatureCache};

use super::{FileRecord, HashError, Hasher};

/// Which cache operations a signature lookup may perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Return a cached signature when a valid entry exists.
    pub read_from_cache: bool,
    /// Store freshly computed signatures.
    pub write_to_cache: bool,
}

impl CachePolicy {
    /// No cache access at all.
    pub const DISABLED: Self = Self {
        read_from_cache: false,
        write_to_cache: false,
    };

    /// Read and write.
    pub const READ_WRITE: Self = Self {
        read_from_cache: true,
        write_to_cache: true,
    };

    /// Always re-hash, always store.
    pub const REFRESH: Self = Self {
        read_from_cache: false,
        write_to_cache: true,
    };

    /// Whether the policy touches the cache at all.
    #[must_use]
    pub fn uses_cache(&self) -> bool {
        self.read_from_cache || self.write_to_cache
    }
}

/// Errors from [`SignatureComputer::signature`].
#[derive(thiserror::Error, Debug)]
pub enum SignatureError {
    /// The file could not be read. Exclude it from grouping.
    #[error(transparent)]
    Read(#[from] HashError),

    /// The cache store could not be opened. Fatal for the run.
    #[error(transparent)]
    CacheUnavailable(CacheError),
}

/// Where a signature came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureSource {
    /// Returned from a valid cache entry without reading the file.
    Cache,
    /// Computed by reading the file.
    Computed,
}

/// Computes content signatures under a [`CachePolicy`].
pub struct SignatureComputer<'c> {
    hasher: Hasher,
    policy: CachePolicy,
    cache: Option<&'c mut SignatureCache>,
}

impl std::fmt::Debug for SignatureComputer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureComputer")
            .field("hasher", &self.hasher)
            .field("policy", &self.policy)
            .field("cache", &self.cache.as_ref().map(|_| "<cache>"))
            .finish()
    }
}

impl<'c> SignatureComputer<'c> {
    /// A computer that never touches a cache.
    #[must_use]
    pub fn uncached(hasher: Hasher) -> Self {
        Self {
            hasher,
            policy: CachePolicy::DISABLED,
            cache: None,
        }
    }

    /// A computer that uses `cache` as `policy` allows.
    #[must_use]
    pub fn with_cache(hasher: Hasher, policy: CachePolicy, cache: &'c mut SignatureCache) -> Self {
        Self {
            hasher,
            policy,
            cache: Some(cache),
        }
    }

    /// The policy in effect.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Return the signature of `record`.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::Read`] if the file cannot be read
    /// - [`SignatureError::CacheUnavailable`] if the cache store cannot be opened
    pub fn signature(&mut self, record: &FileRecord) -> Result<String, SignatureError> {
        self.signature_with_source(record).map(|(sig, _)| sig)
    }

    /// Like [`signature`](Self::signature), also reporting where it came from.
    ///
    /// # Errors
    ///
    /// Same as [`signature`](Self::signature).
    pub fn signature_with_source(
        &mut self,
        record: &FileRecord,
    ) -> Result<(String, SignatureSource), SignatureError> {
        if self.policy.read_from_cache {
            if let Some(cache) = self.cache.as_deref_mut() {
                match cache.get(&record.path, record.size) {
                    Ok(Some(entry)) => return Ok((entry.signature, SignatureSource::Cache)),
                    Ok(None) => {}
                    Err(e) if e.is_fatal() => return Err(SignatureError::CacheUnavailable(e)),
                    Err(e) => log::warn!("Cache fetch error: {}", e),
                }
            }
        }

        let signature = match self.hasher.signature(&record.path) {
            Ok(sig) => sig,
            Err(e) => {
                log::warn!("File read error: {}", e);
                return Err(SignatureError::Read(e));
            }
        };

        if self.policy.write_to_cache {
            if let Some(cache) = self.cache.as_deref_mut() {
                match cache.put(&record.path, &signature, record.size) {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(SignatureError::CacheUnavailable(e)),
                    Err(e) => log::warn!("Failed to cache {}: {}", record.path.display(), e),
                }
            }
        }

        Ok((signature, SignatureSource::Computed))
    }
}
