//! find-dups - duplicate file finder with a persistent signature cache.
//!
//! Files under a directory are grouped by exact size, then by content
//! signature (BLAKE3). Signatures can be memoized in an SQLite-backed cache
//! keyed by path, validated against the current file size on every lookup
//! and swept for age by the maintenance commands.

pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::{CacheMaintainer, SignatureCache, UpdateMode};
use crate::cli::{
    CacheFileArg, CleanCacheArgs, Cli, Commands, OutputFormat, ScanArgs, UpdateCacheArgs,
};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderConfig};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{CachePolicy, Hasher};

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for invalid configuration, a missing or non-directory
/// root, an unusable cache store, or a failure to write the report.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let quiet = cli.quiet;
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Scan(args) => handle_scan(args, &config, quiet),
        Commands::UpdateCache(args) => handle_update_cache(args, &config, quiet),
        Commands::CleanCache(args) => handle_clean_cache(&args, &config),
    }
}

fn cache_location(arg: &CacheFileArg, config: &Config) -> PathBuf {
    arg.cache_file.clone().unwrap_or_else(|| config.cache_path())
}

fn hasher_for(threshold: Option<u64>, config: &Config) -> Hasher {
    Hasher::new().with_mmap_threshold(threshold.unwrap_or(config.mmap_threshold))
}

fn close_cache(cache: &mut SignatureCache) {
    if let Err(e) = cache.close() {
        log::warn!("Failed to close signature cache: {}", e);
    }
}

fn handle_scan(args: ScanArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let use_cache = args.cache || (config.use_cache && !args.no_cache);
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(quiet));

    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_cache_policy(if use_cache {
                CachePolicy::READ_WRITE
            } else {
                CachePolicy::DISABLED
            })
            .with_hasher(hasher_for(args.mmap_threshold, config))
            .with_progress_callback(progress),
    );

    let mut cache = use_cache.then(|| SignatureCache::new(cache_location(&args.cache_file, config)));
    if let Some(cache) = &cache {
        log::debug!("Using signature cache at {:?}", cache.path());
    }

    let result = finder.find_duplicates(&args.path, cache.as_mut());
    if let Some(cache) = cache.as_mut() {
        close_cache(cache);
    }
    let (groups, summary) =
        result.with_context(|| format!("Failed to scan {}", args.path.display()))?;

    let exit_code = if summary.is_partial() {
        ExitCode::PartialSuccess
    } else if groups.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&groups)
            .write_to(&mut out)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(&groups, &summary, exit_code)
            .write_to(&mut out)
            .context("Failed to write JSON report")?,
    }

    if !quiet {
        if let Some(stats) = summary.cache_stats {
            eprintln!("Cache: {stats}");
        }
        if summary.is_partial() {
            eprintln!(
                "Skipped {} unreadable files and {} inaccessible entries",
                summary.read_failures, summary.traversal_errors
            );
        }
    }

    Ok(exit_code)
}

fn handle_update_cache(args: UpdateCacheArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let mode = if args.full {
        UpdateMode::Full
    } else {
        UpdateMode::Incremental
    };
    let location = cache_location(&args.cache_file, config);
    let mut cache = SignatureCache::new(&location);
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(quiet));

    let result = CacheMaintainer::new(&mut cache)
        .with_hasher(hasher_for(args.mmap_threshold, config))
        .with_progress(progress)
        .update(&args.path, mode);
    close_cache(&mut cache);
    let summary = result.with_context(|| {
        format!(
            "Failed to update cache {} from {}",
            location.display(),
            args.path.display()
        )
    })?;

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "Cached {} of {} files ({} inserted, {} reused, {} failed)",
        summary.inserted + summary.reused,
        summary.files_seen,
        summary.inserted,
        summary.reused,
        summary.failed
    )?;
    print_cleanup(&mut out, &summary.cleanup)?;

    Ok(if summary.is_partial() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn handle_clean_cache(args: &CleanCacheArgs, config: &Config) -> Result<ExitCode> {
    let location = cache_location(&args.cache_file, config);
    let mut cache = SignatureCache::new(&location);

    let result = CacheMaintainer::new(&mut cache).cleanup();
    close_cache(&mut cache);
    let summary = result.with_context(|| format!("Failed to clean cache {}", location.display()))?;

    print_cleanup(&mut std::io::stdout().lock(), &summary)?;
    Ok(ExitCode::Success)
}

fn print_cleanup<W: Write>(out: &mut W, summary: &cache::CleanupSummary) -> std::io::Result<()> {
    writeln!(
        out,
        "Removed {} of {} cache entries ({} expired, {} malformed)",
        summary.deleted, summary.scanned, summary.expired, summary.malformed
    )
}
