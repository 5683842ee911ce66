// tests/common/mod.rs

#![allow(dead_code)]

use git2::{Repository, Signature, Time};
use image::{DynamicImage, GrayImage, Luma};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use web_montage::{MontageError, MontageResult, RenderEngine};

pub const BASE_TIME: i64 = 1_700_000_000;

/// A scratch git repository with helpers to build a history
pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
    commits: i64,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo, commits: 0 }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    /// Commits the given paths (added or removed) and returns the abbreviated id
    pub fn commit(&mut self, message: &str, add: &[&str], remove: &[&str]) -> String {
        let head = self.repo.head().ok().and_then(|h| h.target()).map(|oid| oid.to_string());
        let parents: Vec<&str> = head.iter().map(String::as_str).collect();
        self.write_commit(message, add, remove, &parents, Some("HEAD"))
    }

    /// Commits the index on top of `parents` without moving HEAD
    pub fn commit_aside(&mut self, message: &str, add: &[&str], parents: &[&str]) -> String {
        self.write_commit(message, add, &[], parents, None)
    }

    /// Commits the index as a merge of HEAD and `other`
    pub fn merge(&mut self, message: &str, other: &str) -> String {
        let head = self.repo.head().unwrap().target().unwrap().to_string();
        self.write_commit(message, &[], &[], &[head.as_str(), other], Some("HEAD"))
    }

    fn write_commit(
        &mut self,
        message: &str,
        add: &[&str],
        remove: &[&str],
        parents: &[&str],
        update_ref: Option<&str>,
    ) -> String {
        // distinct, increasing timestamps keep the time-sorted walk stable
        let time = Time::new(BASE_TIME + self.commits * 60, 0);
        self.commits += 1;
        let sig = Signature::new("Montage Test", "test@example.com", &time).unwrap();

        let repo = &self.repo;
        let mut index = repo.index().unwrap();
        for rel in remove {
            index.remove_path(Path::new(rel)).unwrap();
        }
        for rel in add {
            index.add_path(Path::new(rel)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let parents: Vec<git2::Commit> = parents
            .iter()
            .map(|id| repo.revparse_single(id).unwrap().peel_to_commit().unwrap())
            .collect();
        let parents: Vec<&git2::Commit> = parents.iter().collect();
        let oid = repo.commit(update_ref, &sig, &sig, message, &tree, &parents).unwrap();

        let commit = repo.find_commit(oid).unwrap();
        let short = commit.as_object().short_id().unwrap();
        short.as_str().unwrap().to_string()
    }

    /// Writes `contents` to `rel` and commits it
    pub fn commit_file(&mut self, rel: &str, contents: &str) -> String {
        self.write(rel, contents);
        self.commit(&format!("update {rel}"), &[rel], &[])
    }

    pub fn rename(&mut self, from: &str, to: &str) -> String {
        let dest = self.dir.path().join(to);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::rename(self.dir.path().join(from), dest).unwrap();
        self.commit(&format!("rename {from} to {to}"), &[to], &[from])
    }

    pub fn head_name(&self) -> String {
        self.repo.head().unwrap().name().unwrap().to_string()
    }
}

/// Renders a page whose first line is a column number as a 9x8 strip with a
/// dark bar in that column. Lines after the first are "markup" that does not
/// change the picture.
pub struct BarEngine {
    target: Option<PathBuf>,
}

impl BarEngine {
    pub fn new() -> Self {
        Self { target: None }
    }
}

impl RenderEngine for BarEngine {
    fn load(&mut self, target: &Path) -> MontageResult<()> {
        self.target = Some(target.to_path_buf());
        Ok(())
    }

    fn reload(&mut self) -> MontageResult<()> {
        Ok(())
    }

    fn screenshot(&mut self) -> MontageResult<DynamicImage> {
        let target = self.target.clone().unwrap_or_default();
        let text = fs::read_to_string(&target)
            .map_err(|e| MontageError::render(target.display().to_string(), e))?;
        let column: u32 = text
            .lines()
            .next()
            .and_then(|line| line.trim().parse().ok())
            .ok_or_else(|| MontageError::render(target.display().to_string(), "unparseable page"))?;
        Ok(DynamicImage::ImageLuma8(GrayImage::from_fn(9, 8, |x, _| {
            Luma([if x == column { 0 } else { 240 }])
        })))
    }
}
