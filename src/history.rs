// src/history.rs

use crate::error::MontageResult;
use crate::model::RevisionSequence;
use crate::repo::VersionControl;
use log::info;
use std::path::Path;

/// Lists every revision that modified `file`, oldest first.
///
/// A file with no commits yields an empty sequence. An unknown path, or one
/// that leaves the working tree, is a `History` error; a repository without
/// commits is a `Repository` error.
pub fn file_history<V: VersionControl + ?Sized>(vcs: &V, file: &Path) -> MontageResult<RevisionSequence> {
    let newest_first = vcs.log_follow(file)?;
    let history = RevisionSequence::from_newest_first(newest_first);

    match (history.first(), history.last()) {
        (Some(first), Some(last)) => info!(
            "Found {} revisions of {} ({} .. {})",
            history.len(),
            file.display(),
            first.id,
            last.id
        ),
        _ => info!("{} has no recorded history", file.display()),
    }

    Ok(history)
}
