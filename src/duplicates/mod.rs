//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping
//! - Grouping by `(signature, size)`
//! - Ordering confirmed groups for the report
//! - The pipeline that ties them together

pub mod finder;
pub mod groups;
pub mod report;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{
    GroupingStats, SignatureBucket, SignatureBucketIndex, SignatureKey, SizeBucket,
    SizeBucketIndex,
};
pub use report::{DuplicateGroup, DuplicateReporter};
