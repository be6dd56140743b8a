//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (`<config dir>/find-dups/config.toml`, or `--config PATH`)
//! 3. `FIND_DUPS_*` environment variables (e.g. `FIND_DUPS_CACHE_FILE`)
//! 4. CLI flags, applied by the caller after loading
//!
//! ```toml
//! cache_file = "/var/cache/find_dups.cache"
//! use_cache = true
//! mmap_threshold = 134217728
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cache::default_cache_path;
use crate::scanner::DEFAULT_MMAP_THRESHOLD;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "FIND_DUPS_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Location of the signature cache. `None` means `~/.find_dups.cache`.
    pub cache_file: Option<PathBuf>,
    /// Consult and update the cache during `scan` without `-C`.
    pub use_cache: bool,
    /// Files at or above this many bytes are hashed through a memory map.
    pub mmap_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_file: None,
            use_cache: false,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has a wrongly typed value.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

impl Config {
    /// Load configuration.
    ///
    /// With `explicit` set, that file must exist. Otherwise the platform
    /// default file is used if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit file is missing or any layer
    /// is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::load_from_path(path)
            }
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path),
                None => Self::extract(Self::figment(None)),
            },
        }
    }

    /// Load configuration layered over the TOML file at `path`.
    ///
    /// A missing file contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any layer is invalid.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        Self::extract(Self::figment(Some(path)))
    }

    /// The layered provider stack.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "find-dups").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Effective cache location.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(default_cache_path)
    }
}
