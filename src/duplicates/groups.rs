//! Size and signature bucket indices.
//!
//! # Overview
//!
//! Grouping runs in two phases. [`SizeBucketIndex`] groups every walked file
//! by its exact size; files with a size nobody else has cannot be
//! duplicates and are never read. [`SignatureBucketIndex`] then groups the
//! survivors by `(signature, size)`.
//!
//! Both indices keep buckets in the order their key was first seen and keep
//! files in insertion order within a bucket, so a run over an unchanged tree
//! always produces the same groups in the same order.
//!
//! # Example
//!
//! ```
//! use find_dups::duplicates::SizeBucketIndex;
//! use find_dups::scanner::FileRecord;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let mut index = SizeBucketIndex::new();
//! index.add(FileRecord::new(PathBuf::from("/a"), 1024, SystemTime::now()));
//! index.add(FileRecord::new(PathBuf::from("/b"), 1024, SystemTime::now()));
//! index.add(FileRecord::new(PathBuf::from("/c"), 2048, SystemTime::now()));
//!
//! assert_eq!(index.len(), 2);
//! assert_eq!(index.candidates().count(), 1);
//! assert_eq!(index.stats().eliminated_unique, 1);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use crate::scanner::FileRecord;

/// Insertion-ordered multimap shared by both indices.
#[derive(Debug, Clone)]
struct OrderedBuckets<K> {
    positions: HashMap<K, usize>,
    buckets: Vec<(K, Vec<FileRecord>)>,
}

impl<K> Default for OrderedBuckets<K> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            buckets: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> OrderedBuckets<K> {
    fn push(&mut self, key: K, record: FileRecord) {
        match self.positions.get(&key) {
            Some(&idx) => self.buckets[idx].1.push(record),
            None => {
                self.positions.insert(key.clone(), self.buckets.len());
                self.buckets.push((key, vec![record]));
            }
        }
    }
}

/// A group of files with the same size.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeBucket {
    /// File size in bytes (shared by all files in this bucket)
    pub size: u64,
    /// Files with this exact size, in discovery order
    pub files: Vec<FileRecord>,
}

impl SizeBucket {
    /// Number of files in this bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check if this bucket has potential duplicates (2+ files).
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.files.len() > 1
    }
}

/// Statistics from the size grouping phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files added
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of distinct file sizes
    pub unique_sizes: usize,
    /// Number of files in buckets of 2+
    pub potential_duplicates: usize,
    /// Number of files alone in their bucket
    pub eliminated_unique: usize,
    /// Number of buckets with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Groups file records by exact size.
#[derive(Debug, Clone, Default)]
pub struct SizeBucketIndex {
    inner: OrderedBuckets<u64>,
    total_size: u64,
    total_files: usize,
}

impl SizeBucketIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to the bucket for its size.
    pub fn add(&mut self, record: FileRecord) {
        self.total_files += 1;
        self.total_size += record.size;
        self.inner.push(record.size, record);
    }

    /// Number of distinct sizes seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Whether nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.buckets.is_empty()
    }

    /// Files in the bucket for `size`, if any.
    #[must_use]
    pub fn bucket(&self, size: u64) -> Option<&[FileRecord]> {
        self.inner
            .positions
            .get(&size)
            .map(|&idx| self.inner.buckets[idx].1.as_slice())
    }

    /// Buckets with 2+ files, in discovery order.
    pub fn candidates(&self) -> impl Iterator<Item = (u64, &[FileRecord])> + '_ {
        self.inner
            .buckets
            .iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(size, files)| (*size, files.as_slice()))
    }

    /// Consume the index, yielding every bucket in discovery order.
    #[must_use]
    pub fn into_buckets(self) -> Vec<SizeBucket> {
        self.inner
            .buckets
            .into_iter()
            .map(|(size, files)| SizeBucket { size, files })
            .collect()
    }

    /// Summarize the grouping.
    #[must_use]
    pub fn stats(&self) -> GroupingStats {
        let mut stats = GroupingStats {
            total_files: self.total_files,
            total_size: self.total_size,
            unique_sizes: self.inner.buckets.len(),
            ..GroupingStats::default()
        };
        for (_, files) in &self.inner.buckets {
            if files.len() > 1 {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
            } else {
                stats.eliminated_unique += files.len();
            }
        }
        stats
    }
}

/// Composite key of a signature bucket.
///
/// The size is part of the key so that a degenerate signature can never
/// match across unrelated sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    /// Hex content signature
    pub signature: String,
    /// File size in bytes
    pub size: u64,
}

impl SignatureKey {
    /// Create a key.
    #[must_use]
    pub fn new(signature: impl Into<String>, size: u64) -> Self {
        Self {
            signature: signature.into(),
            size,
        }
    }
}

/// A group of files sharing a `(signature, size)` key.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureBucket {
    /// The shared key
    pub key: SignatureKey,
    /// Members in insertion order
    pub files: Vec<FileRecord>,
}

impl SignatureBucket {
    /// Number of files in this bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Groups file records by `(signature, size)`.
#[derive(Debug, Clone, Default)]
pub struct SignatureBucketIndex {
    inner: OrderedBuckets<SignatureKey>,
}

impl SignatureBucketIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to the bucket for `key`.
    pub fn add(&mut self, key: SignatureKey, record: FileRecord) {
        debug_assert_eq!(
            key.size, record.size,
            "Record size {} doesn't match key size {}",
            record.size, key.size
        );
        self.inner.push(key, record);
    }

    /// Number of distinct keys seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Whether nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.buckets.is_empty()
    }

    /// Consume the index, yielding every bucket in discovery order.
    #[must_use]
    pub fn into_buckets(self) -> Vec<SignatureBucket> {
        self.inner
            .buckets
            .into_iter()
            .map(|(key, files)| SignatureBucket { key, files })
            .collect()
    }
}
