// src/pipeline.rs

use crate::config::MontageConfig;
use crate::dedup::RetainedImages;
use crate::error::{MontageError, MontageResult};
use crate::hasher;
use crate::history::file_history;
use crate::logging::log_revision_error;
use crate::model::RevisionSequence;
use crate::renderer::{ChromeEngine, RenderEngine, Renderer};
use crate::repo::{GitRepository, RepositoryGuard, VersionControl};
use indicatif::ProgressBar;
use log::{debug, error, info};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Opened,
    Walking,
    Rendering,
    Hashing,
    Restoring,
    Done,
    Failed,
}

/// Result of a run. Both arms carry the images retained so far.
#[derive(Debug)]
pub enum PipelineOutcome {
    Done {
        history: RevisionSequence,
        images: RetainedImages,
    },
    Failed {
        history: RevisionSequence,
        images: RetainedImages,
        error: MontageError,
    },
}

impl PipelineOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn images(&self) -> &RetainedImages {
        match self {
            Self::Done { images, .. } | Self::Failed { images, .. } => images,
        }
    }

    pub fn history(&self) -> &RevisionSequence {
        match self {
            Self::Done { history, .. } | Self::Failed { history, .. } => history,
        }
    }

    pub fn error(&self) -> Option<&MontageError> {
        match self {
            Self::Done { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn into_result(self) -> MontageResult<RetainedImages> {
        match self {
            Self::Done { images, .. } => Ok(images),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

/// Walks the history of one file, renders every revision and keeps the
/// visually distinct frames. Revisions are processed strictly one at a time.
pub struct Pipeline {
    config: MontageConfig,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: MontageConfig) -> Self {
        Self {
            config,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            debug!("Pipeline {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn fail(&mut self, history: RevisionSequence, images: RetainedImages, error: MontageError) -> PipelineOutcome {
        self.transition(PipelineState::Failed);
        PipelineOutcome::Failed { history, images, error }
    }

    /// Runs against a git working tree and headless Chrome
    pub fn run_git(&mut self) -> PipelineOutcome {
        let render = self.config.render.clone();
        self.run(GitRepository::open, move || ChromeEngine::launch(&render))
    }

    /// Runs with the given collaborators.
    ///
    /// `open_engine` is called after the history walk, and only when there is
    /// at least one revision to render. The repository is back on its
    /// original ref before this returns, whatever the outcome.
    pub fn run<V, E, O, F>(&mut self, open_repo: O, open_engine: F) -> PipelineOutcome
    where
        V: VersionControl,
        E: RenderEngine,
        O: FnOnce(&Path) -> MontageResult<V>,
        F: FnOnce() -> MontageResult<E>,
    {
        self.state = PipelineState::Idle;
        let mut history = RevisionSequence::default();
        let mut images = RetainedImages::new();

        if let Err(e) = self.config.validate() {
            return self.fail(history, images, e);
        }

        let guard = match open_repo(&self.config.repo).and_then(RepositoryGuard::<V>::open) {
            Ok(guard) => guard,
            Err(e) => return self.fail(history, images, e),
        };
        self.transition(PipelineState::Opened);

        let result = guard.scope(|guard| {
            let walked = self.walk(guard, &mut history, &mut images, open_engine);
            self.transition(PipelineState::Restoring);
            walked
        });

        match result {
            Ok(()) => {
                self.transition(PipelineState::Done);
                info!(
                    "Retained {} of {} revisions of {}",
                    images.len(),
                    history.len(),
                    self.config.file.display()
                );
                PipelineOutcome::Done { history, images }
            }
            Err(e) => {
                error!("Montage of {} failed: {}", self.config.file.display(), e);
                self.fail(history, images, e)
            }
        }
    }

    fn walk<V, E, F>(
        &mut self,
        guard: &mut RepositoryGuard<V>,
        history: &mut RevisionSequence,
        images: &mut RetainedImages,
        open_engine: F,
    ) -> MontageResult<()>
    where
        V: VersionControl,
        E: RenderEngine,
        F: FnOnce() -> MontageResult<E>,
    {
        self.transition(PipelineState::Walking);
        *history = file_history(guard.vcs(), &self.config.file)?;
        if history.is_empty() {
            return Ok(());
        }

        let mut renderer = Renderer::new(open_engine()?, guard.workdir());

        let bar = if self.config.show_progress {
            ProgressBar::new(history.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_message("Rendering revisions");

        for revision in history.iter() {
            let step = guard.checkout(&revision.id).and_then(|()| {
                self.transition(PipelineState::Rendering);
                renderer.capture(revision)
            });
            let snapshot = match step {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log_revision_error(&revision.id, &revision.path, &e);
                    bar.abandon();
                    return Err(e);
                }
            };

            self.transition(PipelineState::Hashing);
            let fingerprint = hasher::fingerprint(&snapshot.image, self.config.hash_size);
            if images.offer(fingerprint.clone(), snapshot) {
                debug!("{} -> {} (new)", revision.id, fingerprint);
            } else {
                debug!("{} -> {} (duplicate)", revision.id, fingerprint);
            }
            bar.inc(1);
        }

        bar.finish_with_message("Rendering complete");
        renderer.close();
        Ok(())
    }
}
