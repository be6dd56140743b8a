//! Plain-text duplicate report.
//!
//! One block per group, largest size first:
//!
//! ```text
//! === 4 B ============================================
//! /data/a
//! /data/b
//! ```
//!
//! Nothing is written when there are no groups.

use std::io::{self, Write};

use crate::duplicates::DuplicateGroup;

const RULE: &str = "============================================";

/// Text formatter over a slice of groups.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> TextOutput<'a> {
    /// Wrap `groups`, which must already be in report order.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in self.groups {
            writeln!(writer, "=== {} {}", group.size_display(), RULE)?;
            for file in &group.files {
                writeln!(writer, "{}", file.path.display())?;
            }
        }
        writer.flush()
    }
}
