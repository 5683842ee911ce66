// src/export.rs

use crate::dedup::RetainedImages;
use crate::error::{MontageError, MontageResult};
use crate::pipeline::PipelineOutcome;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub fn frame_path(dir: &Path, position: usize) -> PathBuf {
    dir.join(format!("frame_{:06}.png", position))
}

/// Writes the retained images to `dir` as numbered PNG frames, in order.
pub fn write_frames(images: &RetainedImages, dir: &Path) -> MontageResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| MontageError::io(dir, e))?;

    let mut written = Vec::with_capacity(images.len());
    for (position, snapshot) in images.ordered_images().enumerate() {
        let path = frame_path(dir, position);
        snapshot.image.save(&path).map_err(|e| match e {
            image::ImageError::IoError(io) => MontageError::io(&path, io),
            other => MontageError::io(&path, std::io::Error::other(other)),
        })?;
        written.push(path);
    }

    info!("Wrote {} frames to {}", written.len(), dir.display());
    Ok(written)
}

/// Saves the frames of a run, including those a failed run retained before
/// it stopped. A failed run still reports its own error, never the write's.
pub fn save_outcome(outcome: PipelineOutcome, dir: &Path) -> MontageResult<Vec<PathBuf>> {
    if !outcome.is_done() && outcome.images().is_empty() {
        return outcome.into_result().map(|_| Vec::new());
    }

    let written = write_frames(outcome.images(), dir);
    match (outcome.into_result(), written) {
        (Ok(_), written) => written,
        (Err(e), Ok(frames)) => {
            warn!(
                "Saved {} frames retained before the failure to {}",
                frames.len(),
                dir.display()
            );
            Err(e)
        }
        (Err(e), Err(write)) => {
            error!("Failed to save partial frames: {}", write);
            Err(e)
        }
    }
}
