// src/model.rs

use image::DynamicImage;
use std::path::PathBuf;

/// Abbreviated commit id naming a point in history
pub type RevisionId = String;

/// A single revision that touched the target file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: RevisionId,
    /// Path of the target file at this revision, relative to the repository root
    pub path: PathBuf,
    /// Commit time in seconds since the epoch
    pub timestamp: i64,
    pub summary: String,
}

/// Revisions touching a file, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionSequence {
    revisions: Vec<Revision>,
}

impl RevisionSequence {
    /// Builds a sequence from newest-first revisions as reported by `git log`
    pub fn from_newest_first(mut revisions: Vec<Revision>) -> Self {
        revisions.reverse();
        Self { revisions }
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Revision> {
        self.revisions.iter()
    }

    pub fn first(&self) -> Option<&Revision> {
        self.revisions.first()
    }

    pub fn last(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.revisions.iter().map(|r| r.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a RevisionSequence {
    type Item = &'a Revision;
    type IntoIter = std::slice::Iter<'a, Revision>;

    fn into_iter(self) -> Self::IntoIter {
        self.revisions.iter()
    }
}

/// A captured render of the target file
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Capture order within one run, starting at 0
    pub index: usize,
    pub revision: RevisionId,
    pub image: DynamicImage,
}
