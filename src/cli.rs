//! Command-line interface definitions for find-dups.
//!
//! This module defines all CLI arguments and subcommands using the clap
//! derive API. Global options (verbosity, config file) apply to every
//! subcommand.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates under a directory
//! find_dups scan ~/Downloads
//!
//! # Same, using and updating the signature cache
//! find_dups scan -C ~/Downloads
//!
//! # Re-hash everything under a tree into the cache, then sweep it
//! find_dups update-cache --full ~/Pictures
//!
//! # Drop expired and malformed cache entries
//! find_dups clean-cache
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Find identical files under a directory tree.
///
/// Files are grouped by size first and by content signature second. Content
/// signatures can be kept in a persistent cache so repeated scans skip
/// unchanged files.
#[derive(Debug, Parser)]
#[command(name = "find_dups")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report groups of identical files under a directory
    Scan(ScanArgs),
    /// Store signatures for every file under a directory, then sweep the cache
    UpdateCache(UpdateCacheArgs),
    /// Remove expired and malformed entries from the cache
    CleanCache(CleanCacheArgs),
}

/// Options shared by every command that touches the cache.
#[derive(Debug, Clone, Args)]
pub struct CacheFileArg {
    /// Path to the signature cache (default: ~/.find_dups.cache)
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan for duplicates
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Consult and update the signature cache
    #[arg(short = 'C', long)]
    pub cache: bool,

    /// Do not use the cache even if the config file enables it
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    #[command(flatten)]
    pub cache_file: CacheFileArg,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Memory-map files at or above this size when hashing (e.g. 64MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub mmap_threshold: Option<u64>,
}

/// Arguments for the update-cache subcommand.
#[derive(Debug, Args)]
pub struct UpdateCacheArgs {
    /// Directory whose files should be cached
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Re-hash every file instead of keeping valid entries
    #[arg(short, long)]
    pub full: bool,

    #[command(flatten)]
    pub cache_file: CacheFileArg,

    /// Memory-map files at or above this size when hashing (e.g. 64MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub mmap_threshold: Option<u64>,
}

/// Arguments for the clean-cache subcommand.
#[derive(Debug, Args)]
pub struct CleanCacheArgs {
    #[command(flatten)]
    pub cache_file: CacheFileArg,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Grouped paths under `=== <size>` headers
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use find_dups::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("64MiB").unwrap(), 64 * 1024 * 1024);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// or has an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
