//! Output formatters for duplicate scan results.
//!
//! - [`text`]: grouped paths under size headers, for people
//! - [`json`]: the same groups plus the scan summary, for scripts
//!
//! # Example
//!
//! ```no_run
//! use find_dups::duplicates::DuplicateFinder;
//! use find_dups::output::TextOutput;
//! use std::path::Path;
//!
//! let (groups, _summary) = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("."), None)
//!     .unwrap();
//! TextOutput::new(&groups).write_to(&mut std::io::stdout().lock()).unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::TextOutput;
