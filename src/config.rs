// src/config.rs

use crate::cli::Args;
use crate::error::{MontageError, MontageResult};
use crate::hasher::{DEFAULT_HASH_SIZE, MAX_HASH_SIZE};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the headless browser
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub browser: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Upper bound for a single capture
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            browser: PathBuf::from("google-chrome"),
            width: 1280,
            height: 720,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for one montage run
#[derive(Debug, Clone)]
pub struct MontageConfig {
    /// Root of the repository
    pub repo: PathBuf,

    /// Target file relative to `repo`
    pub file: PathBuf,

    pub hash_size: u32,

    pub render: RenderConfig,

    pub show_progress: bool,
}

impl Default for MontageConfig {
    fn default() -> Self {
        Self {
            repo: PathBuf::from("."),
            file: PathBuf::from("index.html"),
            hash_size: DEFAULT_HASH_SIZE,
            render: RenderConfig::default(),
            show_progress: true,
        }
    }
}

impl MontageConfig {
    pub fn new(repo: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MontageResult<()> {
        if !(1..=MAX_HASH_SIZE).contains(&self.hash_size) {
            return Err(MontageError::config(format!(
                "hash size must be between 1 and {MAX_HASH_SIZE}, got {}",
                self.hash_size
            )));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(MontageError::config("window width/height must be non-zero"));
        }
        if self.render.timeout.is_zero() {
            return Err(MontageError::config("render timeout must be non-zero"));
        }
        if self.file.is_absolute() {
            return Err(MontageError::config(format!(
                "file '{}' must be relative to the repository root",
                self.file.display()
            )));
        }
        Ok(())
    }
}

impl From<&Args> for MontageConfig {
    fn from(args: &Args) -> Self {
        Self {
            repo: args.repo.clone(),
            file: args.file.clone(),
            hash_size: args.hash_size,
            render: RenderConfig {
                browser: args.browser.clone(),
                width: args.width,
                height: args.height,
                timeout: Duration::from_secs(args.timeout),
            },
            show_progress: !args.no_progress,
        }
    }
}
