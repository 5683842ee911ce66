// src/lib.rs

//! Renders every historical revision of a file tracked in git and keeps the
//! perceptually distinct frames, oldest first, ready to be stitched into a
//! timelapse.

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod hasher;
pub mod history;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod renderer;
pub mod repo;

pub use config::{MontageConfig, RenderConfig};
pub use dedup::RetainedImages;
pub use error::{ErrorKind, MontageError, MontageResult};
pub use hasher::{fingerprint, Fingerprint};
pub use model::{Revision, RevisionId, RevisionSequence, Snapshot};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineState};
pub use renderer::{ChromeEngine, RenderEngine, Renderer};
pub use repo::{GitRepository, RepositoryGuard, VersionControl};
