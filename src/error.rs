// src/error.rs

use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type MontageResult<T> = core::result::Result<T, MontageError>;

/// Stable classification of a [`MontageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Repository,
    History,
    Checkout,
    RenderEngine,
    Render,
    Io,
    Config,
}

#[derive(Error, Debug)]
pub enum MontageError {
    /// The path is not an accessible, non-bare repository
    #[error("repository error at {}: {message}", .path.display())]
    Repository { path: PathBuf, message: String },

    /// The history of the target file could not be listed
    #[error("history error for {}: {message}", .path.display())]
    History { path: PathBuf, message: String },

    /// A specific revision could not be checked out
    #[error("checkout of {revision} failed: {message}")]
    Checkout { revision: String, message: String },

    /// The render engine could not be started
    #[error("render engine error: {0}")]
    RenderEngine(String),

    /// A single capture failed or timed out
    #[error("render of {target} failed: {message}")]
    Render { target: String, message: String },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MontageError {
    pub fn repository(path: impl AsRef<Path>, cause: impl Display) -> Self {
        Self::Repository {
            path: path.as_ref().to_path_buf(),
            message: cause.to_string(),
        }
    }

    pub fn history(path: impl AsRef<Path>, cause: impl Display) -> Self {
        Self::History {
            path: path.as_ref().to_path_buf(),
            message: cause.to_string(),
        }
    }

    pub fn checkout(revision: impl Into<String>, cause: impl Display) -> Self {
        Self::Checkout {
            revision: revision.into(),
            message: cause.to_string(),
        }
    }

    pub fn render_engine(cause: impl Display) -> Self {
        Self::RenderEngine(cause.to_string())
    }

    pub fn render(target: impl Into<String>, cause: impl Display) -> Self {
        Self::Render {
            target: target.into(),
            message: cause.to_string(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repository { .. } => ErrorKind::Repository,
            Self::History { .. } => ErrorKind::History,
            Self::Checkout { .. } => ErrorKind::Checkout,
            Self::RenderEngine(_) => ErrorKind::RenderEngine,
            Self::Render { .. } => ErrorKind::Render,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}
