//! BLAKE3 file hasher with streaming and memory-mapped paths.
//!
//! # Overview
//!
//! The [`Hasher`] reads the entire content of a file and produces its
//! BLAKE3 digest. Small files are streamed through a fixed buffer; files at
//! or above the mmap threshold are mapped read-only and hashed in place.
//! Both paths yield the same digest for the same bytes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use memmap2::Mmap;

use super::HashError;

/// A 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Files at or above this size are hashed through a memory map.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Render a digest as a lowercase hex string.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Whole-file content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    use_mmap: bool,
    mmap_threshold: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with memory mapping enabled at the default threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            use_mmap: true,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }

    /// Enable or disable memory-mapped hashing.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    /// Set the size at which memory-mapped hashing kicks in.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Hash the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        // Mapping a zero-length file fails on some platforms
        if self.use_mmap && len > 0 && len >= self.mmap_threshold {
            match self.hash_mmap(&file) {
                Ok(hash) => return Ok(hash),
                Err(e) => {
                    log::debug!(
                        "mmap hashing failed for {}, falling back to streaming: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        self.hash_stream(file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Hash the file and return the signature as a hex string.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn signature(&self, path: &Path) -> Result<String, HashError> {
        self.full_hash(path).map(|hash| hash_to_hex(&hash))
    }

    fn hash_mmap(&self, file: &File) -> std::io::Result<Hash> {
        // SAFETY: the map is read-only and dropped before returning. Concurrent
        // truncation by another process is outside the supported model.
        let mmap = unsafe { Mmap::map(file)? };
        let mut hasher = blake3::Hasher::new();
        hasher.update(&mmap);
        Ok(*hasher.finalize().as_bytes())
    }

    fn hash_stream(&self, file: File) -> std::io::Result<Hash> {
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut hasher = blake3::Hasher::new();

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..n]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}
