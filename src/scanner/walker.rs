//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and collecting file metadata for duplicate detection. Traversal is
//! single-threaded and deterministic: entries within a directory are
//! visited in file-name order.
//!
//! # Rules
//!
//! - Directories are descended into but never emitted
//! - Symbolic links are skipped entirely (never followed, never recorded)
//! - Special files (FIFOs, sockets, devices) are skipped
//! - A per-entry error is logged and yielded as [`ScanError`]; the walk
//!   continues with the remaining siblings
//!
//! # Example
//!
//! ```no_run
//! use find_dups::scanner::Walker;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"));
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use super::{FileRecord, ScanError};

/// Directory walker for file discovery.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            root: path.to_path_buf(),
        }
    }

    /// Root directory of this walk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Returns an iterator over [`FileRecord`] results. Errors are yielded
    /// as [`ScanError`] values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        walk_dir
            .into_iter()
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();

                    if file_type.is_dir() {
                        return None;
                    }

                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", entry.path().display());
                        return None;
                    }

                    if !file_type.is_file() {
                        log::debug!("Skipping special file: {}", entry.path().display());
                        return None;
                    }

                    let path = entry.into_path();

                    // walkdir's metadata() for a non-followed entry is lstat
                    let metadata = match std::fs::symlink_metadata(&path) {
                        Ok(m) => m,
                        Err(e) => return Some(Err(self.handle_io_error(&path, e))),
                    };

                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

                    Some(Ok(FileRecord::new(path, metadata.len(), modified)))
                }
                Err(e) => Some(Err(self.handle_walkdir_error(e))),
            })
    }

    /// Handle I/O errors during entry inspection.
    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }

    /// Handle walkdir errors (unreadable directories, vanished entries).
    fn handle_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        match error.into_io_error() {
            Some(io_error) => self.handle_io_error(&path, io_error),
            None => {
                // Only raised for symlink loops, which cannot happen without following links
                log::warn!("Traversal error for {}", path.display());
                ScanError::Io {
                    path,
                    source: std::io::Error::other("filesystem loop"),
                }
            }
        }
    }
}
