//! Confirmed duplicate groups and their report ordering.

use std::path::PathBuf;

use bytesize::ByteSize;

use super::groups::SignatureBucket;
use crate::scanner::FileRecord;

/// Confirmed duplicate group of files.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    /// Hex content signature shared by every member
    pub signature: String,
    /// File size in bytes shared by every member
    pub size: u64,
    /// Members in discovery order
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(signature: impl Into<String>, size: u64, files: Vec<FileRecord>) -> Self {
        Self {
            signature: signature.into(),
            size,
            files,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Total wasted space (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size.saturating_mul(self.duplicate_count() as u64)
    }

    /// Human-readable size, e.g. `4 B` or `1.0 KiB`.
    #[must_use]
    pub fn size_display(&self) -> String {
        ByteSize::b(self.size).to_string()
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

impl From<SignatureBucket> for DuplicateGroup {
    fn from(bucket: SignatureBucket) -> Self {
        Self {
            signature: bucket.key.signature,
            size: bucket.key.size,
            files: bucket.files,
        }
    }
}

/// Turns signature buckets into an ordered list of duplicate groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateReporter;

impl DuplicateReporter {
    /// Drop buckets with fewer than two members and order the rest by size,
    /// largest first. The sort is stable, so buckets of equal size keep
    /// their discovery order.
    #[must_use]
    pub fn report(buckets: impl IntoIterator<Item = SignatureBucket>) -> Vec<DuplicateGroup> {
        let mut groups: Vec<DuplicateGroup> = buckets
            .into_iter()
            .filter(|bucket| bucket.len() > 1)
            .map(DuplicateGroup::from)
            .collect();

        groups.sort_by(|a, b| b.size.cmp(&a.size));
        groups
    }

    /// Space freed by keeping one copy per group. Saturates at `u64::MAX`.
    #[must_use]
    pub fn reclaimable_space(groups: &[DuplicateGroup]) -> u64 {
        groups
            .iter()
            .map(DuplicateGroup::wasted_space)
            .fold(0, u64::saturating_add)
    }
}
