//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "size": 4,
//!       "size_display": "4 B",
//!       "signature": "af13...",
//!       "files": ["/data/a", "/data/b"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "duplicate_groups": 1,
//!     "cache": { "lookups": 2, "hits": 2, "hit_ratio": 1.0, ... },
//!     "exit_code": 0,
//!     "exit_code_name": "FD000",
//!     ...
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::cache::CacheStatistics;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// File size in bytes
    pub size: u64,
    /// Human-readable file size
    pub size_display: String,
    /// Hex content signature
    pub signature: String,
    /// Paths of all members, as found by the walk
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            size: group.size,
            size_display: group.size_display(),
            signature: group.signature.clone(),
            files: group
                .files
                .iter()
                .map(|f| f.path.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Cache counters in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCacheStats {
    /// Lookups performed
    pub lookups: u64,
    /// Lookups that returned a usable entry
    pub hits: u64,
    /// Lookups that did not
    pub misses: u64,
    /// Entries removed because the file size changed
    pub invalidations: u64,
    /// Entries that failed to decode
    pub malformed: u64,
    /// Entries written
    pub writes: u64,
    /// `hits / lookups`
    pub hit_ratio: f64,
}

impl From<CacheStatistics> for JsonCacheStats {
    fn from(stats: CacheStatistics) -> Self {
        Self {
            lookups: stats.lookups,
            hits: stats.hits,
            misses: stats.misses(),
            invalidations: stats.invalidations,
            malformed: stats.malformed,
            writes: stats.writes,
            hit_ratio: stats.hit_ratio(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files found
    pub total_files: usize,
    /// Total size of all files found in bytes
    pub total_size: u64,
    /// Files dropped by size grouping
    pub eliminated_by_size: usize,
    /// Files whose signature was computed or looked up
    pub files_hashed: usize,
    /// Files that could not be read
    pub read_failures: usize,
    /// Entries the walk could not inspect
    pub traversal_errors: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding originals)
    pub duplicate_files: usize,
    /// Space that removing duplicates would free (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Cache counters, when a cache was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<JsonCacheStats>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            eliminated_by_size: summary.eliminated_by_size,
            files_hashed: summary.files_hashed,
            read_failures: summary.read_failures,
            traversal_errors: summary.traversal_errors,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            cache: summary.cache_stats.map(JsonCacheStats::from),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups in report order
    pub groups: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate groups, summary and exit code.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            groups: groups.iter().map(JsonDuplicateGroup::from).collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
