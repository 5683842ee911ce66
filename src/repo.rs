// src/repo.rs

use crate::error::{MontageError, MontageResult};
use crate::model::Revision;
use git2::build::CheckoutBuilder;
use git2::{Commit, Delta, DiffFindOptions, DiffOptions, Repository, Tree};
use log::{debug, error, info};
use std::path::{Component, Path, PathBuf};

/// Operations the pipeline needs from a version-control client
pub trait VersionControl {
    /// Root of the working tree
    fn workdir(&self) -> &Path;

    /// Full name of the active branch ref, or the commit id when detached
    fn current_ref(&self) -> MontageResult<String>;

    /// Moves the working tree to `spec` (a branch ref or a revision)
    fn checkout(&mut self, spec: &str) -> MontageResult<()>;

    /// Revisions that modified `path`, newest first, following renames
    fn log_follow(&self, path: &Path) -> MontageResult<Vec<Revision>>;
}

pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepository {
    pub fn open(path: &Path) -> MontageResult<Self> {
        let repo = Repository::open(path).map_err(|e| MontageError::repository(path, e.message()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| MontageError::repository(path, "bare repositories have no working tree"))?;
        let workdir = workdir
            .canonicalize()
            .map_err(|e| MontageError::repository(path, e))?;
        debug!("Opened git repository at {}", workdir.display());
        Ok(Self { repo, workdir })
    }

    fn checkout_commit(&self, spec: &str, commit: &Commit) -> MontageResult<()> {
        let mut opts = CheckoutBuilder::new();
        opts.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut opts))
            .map_err(|e| MontageError::checkout(spec, e.message()))
    }

    /// True when the entry at `path` in `tree` differs from every parent's.
    ///
    /// A merge whose entry matches one of its parents only carried the file
    /// over and is skipped, as `git log` does.
    fn touches(tree: &Tree, parents: &[Tree], path: &Path) -> bool {
        let current = tree.get_path(path).ok().map(|e| e.id());
        if parents.is_empty() {
            return current.is_some();
        }
        parents
            .iter()
            .all(|parent| parent.get_path(path).ok().map(|e| e.id()) != current)
    }

    /// Source path of a rename whose destination is `path`, if `commit` made one
    fn renamed_from(&self, tree: &Tree, parent: Option<&Tree>, path: &Path) -> Result<Option<PathBuf>, git2::Error> {
        let Some(parent) = parent else {
            return Ok(None);
        };

        let mut diff_opts = DiffOptions::new();
        diff_opts.include_untracked(false);
        let mut diff = self.repo.diff_tree_to_tree(Some(parent), Some(tree), Some(&mut diff_opts))?;

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let source = diff
            .deltas()
            .filter(|delta| delta.status() == Delta::Renamed)
            .find(|delta| delta.new_file().path() == Some(path))
            .and_then(|delta| delta.old_file().path().map(Path::to_path_buf));
        Ok(source)
    }

    fn walk_history(&self, path: &Path) -> Result<Vec<Revision>, git2::Error> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(git2::Sort::TIME)?;

        let mut tracked = path.to_path_buf();
        let mut revisions = Vec::new();

        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            let tree = commit.tree()?;
            let parent_trees = commit
                .parents()
                .map(|parent| parent.tree())
                .collect::<Result<Vec<_>, _>>()?;

            if !Self::touches(&tree, &parent_trees, &tracked) {
                continue;
            }

            revisions.push(Revision {
                id: short_id(&commit)?,
                path: tracked.clone(),
                timestamp: commit.time().seconds(),
                summary: commit.summary().unwrap_or_default().to_string(),
            });

            // Older commits know the file under its previous name
            if let Some(source) = self.renamed_from(&tree, parent_trees.first(), &tracked)? {
                debug!("{} renamed {} -> {}", short_id(&commit)?, source.display(), tracked.display());
                tracked = source;
            }
        }

        Ok(revisions)
    }
}

fn short_id(commit: &Commit) -> Result<String, git2::Error> {
    let buf = commit.as_object().short_id()?;
    Ok(buf.as_str().map(String::from).unwrap_or_else(|| commit.id().to_string()))
}

/// Rewrites `path` as a clean path relative to `workdir`.
///
/// `.` components are dropped and `..` is resolved lexically. Absolute paths
/// must lie under `workdir`. Anything that ends up outside the working tree,
/// or at its root, is a `History` error.
pub fn tree_path(workdir: &Path, path: &Path) -> MontageResult<PathBuf> {
    let relative = match path.strip_prefix(workdir) {
        Ok(inside) => inside,
        Err(_) if path.is_absolute() => {
            return Err(MontageError::history(
                path,
                format!("path is outside the working tree {}", workdir.display()),
            ));
        }
        Err(_) => path,
    };

    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => clean.push(part),
            Component::ParentDir => {
                if !clean.pop() {
                    return Err(MontageError::history(path, "path leaves the working tree"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(MontageError::history(path, "path is not relative to the working tree"));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(MontageError::history(path, "path names the working tree itself"));
    }
    Ok(clean)
}

impl VersionControl for GitRepository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn current_ref(&self) -> MontageResult<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| MontageError::repository(&self.workdir, e.message()))?;
        if head.is_branch() {
            if let Some(name) = head.name() {
                return Ok(name.to_string());
            }
        }
        head.target()
            .map(|oid| oid.to_string())
            .ok_or_else(|| MontageError::repository(&self.workdir, "HEAD does not point at a commit"))
    }

    fn checkout(&mut self, spec: &str) -> MontageResult<()> {
        if let Ok(reference) = self.repo.find_reference(spec) {
            if reference.is_branch() {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| MontageError::checkout(spec, e.message()))?;
                self.checkout_commit(spec, &commit)?;
                return self
                    .repo
                    .set_head(spec)
                    .map_err(|e| MontageError::checkout(spec, e.message()));
            }
        }

        let commit = self
            .repo
            .revparse_single(spec)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| MontageError::checkout(spec, e.message()))?;
        self.checkout_commit(spec, &commit)?;
        self.repo
            .set_head_detached(commit.id())
            .map_err(|e| MontageError::checkout(spec, e.message()))
    }

    fn log_follow(&self, path: &Path) -> MontageResult<Vec<Revision>> {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_tree())
            .map_err(|e| {
                MontageError::repository(&self.workdir, format!("no commits to walk: {}", e.message()))
            })?;

        let path = tree_path(&self.workdir, path)?;
        if head.get_path(&path).is_err() && !self.workdir.join(&path).exists() {
            return Err(MontageError::history(
                &path,
                format!("path does not exist in {}", self.workdir.display()),
            ));
        }

        self.walk_history(&path)
            .map_err(|e| MontageError::history(&path, e.message()))
    }
}

/// Holds the repository for one run and puts it back on its original ref
/// when closed or dropped.
pub struct RepositoryGuard<V: VersionControl> {
    vcs: V,
    original: String,
    restored: bool,
}

impl RepositoryGuard<GitRepository> {
    pub fn open_path(path: &Path) -> MontageResult<Self> {
        Self::open(GitRepository::open(path)?)
    }
}

impl<V: VersionControl> RepositoryGuard<V> {
    pub fn open(mut vcs: V) -> MontageResult<Self> {
        let original = vcs.current_ref()?;
        vcs.checkout(&original)
            .map_err(|e| MontageError::repository(vcs.workdir(), e))?;
        info!("Repository at {} is on {}", vcs.workdir().display(), original);
        Ok(Self {
            vcs,
            original,
            restored: false,
        })
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn workdir(&self) -> &Path {
        self.vcs.workdir()
    }

    pub fn checkout(&mut self, revision: &str) -> MontageResult<()> {
        debug!("Checking out {}", revision);
        self.vcs.checkout(revision)
    }

    /// Restores the original ref. Runs at most once per guard.
    pub fn close(mut self) -> MontageResult<()> {
        self.restore()
    }

    /// Runs `body` with the guard and restores the original ref afterwards,
    /// whatever `body` returned. The body's error wins over a restore error.
    pub fn scope<T>(mut self, body: impl FnOnce(&mut Self) -> MontageResult<T>) -> MontageResult<T> {
        let result = body(&mut self);
        let restored = self.close();
        match (result, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore)) => {
                error!("Failed to restore repository after error: {}", restore);
                Err(e)
            }
        }
    }

    fn restore(&mut self) -> MontageResult<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        info!("Restoring repository to {}", self.original);
        let original = self.original.clone();
        self.vcs.checkout(&original)
    }
}

impl<V: VersionControl> Drop for RepositoryGuard<V> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            error!("Failed to restore repository on drop: {}", e);
        }
    }
}
