//! Build configuration.
//!
//! A [`BuildConfig`] is constructed once at startup (from CLI flags and
//! environment variables) and passed by reference to the orchestrator, the
//! directory walker and the watch loop. Nothing reads configuration from
//! global state.
//!
//! ## Recognized settings
//!
//! ```text
//! --concurrency <N>      Jobs run in parallel (default 30)
//! --magick-bin <PATH>    ImageMagick binary       (or MAGICK_BIN, required)
//! --mozjpeg-bin <PATH>   MozJPEG cjpeg binary     (or MOZJPEG_BIN, required)
//! --env <ENV>            production | development (or GAL_ENV, default production)
//! --verbose              Debug logging
//! -t, --target-dir       Output directory (required)
//! <path>...              Source directories (at least one)
//! ```
//!
//! ## Environments
//!
//! - **production**: static assets bundled into the binary are copied into
//!   the target directory by a job.
//! - **development**: `<asset-dir>/css` is symlinked into the target instead,
//!   so stylesheet edits show up without a rebuild.

use crate::imaging::ToolPaths;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Jobs run in parallel unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Must either set {env} or {flag} (path to the {name} binary)")]
    MissingTool {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },
    #[error("concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),
    #[error("unknown environment '{0}' (expected 'production' or 'development')")]
    UnknownEnv(String),
    #[error("at least one source directory is required")]
    NoSources,
}

/// Selects production vs. development behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GalEnv {
    #[default]
    Production,
    Development,
}

impl GalEnv {
    pub fn is_production(self) -> bool {
        self == GalEnv::Production
    }
}

impl FromStr for GalEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(GalEnv::Production),
            "development" | "dev" => Ok(GalEnv::Development),
            other => Err(ConfigError::UnknownEnv(other.to_string())),
        }
    }
}

impl fmt::Display for GalEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GalEnv::Production => "production",
            GalEnv::Development => "development",
        })
    }
}

/// Everything one build pass needs to know.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Maximum number of jobs running at once.
    pub concurrency: usize,
    pub env: GalEnv,
    /// Directories to collect photos from.
    pub source_dirs: Vec<PathBuf>,
    /// Where the generated site goes.
    pub target_dir: PathBuf,
    /// Hand-authored assets; `<asset_dir>/css` is symlinked in development.
    pub asset_dir: PathBuf,
    pub verbose: bool,
    /// Skip photo variants whose source and parameters are unchanged.
    pub use_cache: bool,
    /// Fixed seed for the index shuffle. `None` seeds from the clock.
    pub shuffle_seed: Option<u64>,
}

impl BuildConfig {
    pub fn new(source_dirs: Vec<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            env: GalEnv::default(),
            source_dirs,
            target_dir: target_dir.into(),
            asset_dir: PathBuf::from("assets"),
            verbose: false,
            use_cache: true,
            shuffle_seed: None,
        }
    }

    /// Validate values that would otherwise only fail mid-pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if self.source_dirs.is_empty() {
            return Err(ConfigError::NoSources);
        }
        Ok(())
    }
}

/// Resolve the two external tool paths. Both are required.
///
/// Empty values count as unset, so `MAGICK_BIN=` does not sneak through.
pub fn resolve_tools(
    magick_bin: Option<PathBuf>,
    mozjpeg_bin: Option<PathBuf>,
) -> Result<ToolPaths, ConfigError> {
    let present = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty());

    let magick_bin = present(magick_bin).ok_or(ConfigError::MissingTool {
        name: "ImageMagick",
        flag: "--magick-bin",
        env: "MAGICK_BIN",
    })?;
    let mozjpeg_bin = present(mozjpeg_bin).ok_or(ConfigError::MissingTool {
        name: "MozJPEG",
        flag: "--mozjpeg-bin",
        env: "MOZJPEG_BIN",
    })?;

    Ok(ToolPaths {
        magick_bin,
        mozjpeg_bin,
    })
}
