//! # Revision-Control Capability
//!
//! This module defines `GitOperations`, the narrow interface through which
//! the pipeline talks to version control. The change detector and the
//! publisher only ever see this trait, never a process or a working
//! directory of their own.
//!
//! ## Design
//!
//! Each method is one revision-control capability with a typed outcome:
//! "is this revision in local history" is an `Option`, "does the index
//! differ from HEAD" is a `bool`, and a push is a [`PushOutcome`] or a typed
//! error. Every method takes the repository root explicitly; there is no
//! ambient current-directory state.
//!
//! In the application, `DefaultGitOperations` wraps the system `git`
//! command (see [`crate::git`]). In tests, an in-memory commit graph
//! implements the same trait so the detection and publishing algorithms
//! can be exercised without spawning processes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Author;
use crate::error::Result;
pub use crate::git::PushOutcome;

/// Trait for git operations - allows faking in tests
pub trait GitOperations: Send + Sync {
    /// Resolves a revision to a commit id. Returns `None` when the revision
    /// is absent from local history (unknown object, shallow truncation).
    fn resolve_commit(&self, root: &Path, rev: &str) -> Result<Option<String>>;

    /// Returns the first parent of `commit`, or `None` for a root commit or
    /// a shallow-clone boundary.
    fn first_parent(&self, root: &Path, commit: &str) -> Result<Option<String>>;

    /// Lists repository-relative paths with the given extension that were
    /// added or modified between `from` and `to`. Deletions are excluded and
    /// renames count as delete + add.
    fn changed_paths(&self, root: &Path, from: &str, to: &str, extension: &str)
        -> Result<Vec<PathBuf>>;

    /// Lists every repository-relative path in `commit`'s tree.
    fn tree_paths(&self, root: &Path, commit: &str) -> Result<Vec<PathBuf>>;

    /// Stages exactly the given repository-relative files.
    fn stage(&self, root: &Path, files: &[PathBuf]) -> Result<()>;

    /// Reports whether the index differs from `HEAD` for any of `files`.
    fn has_staged_changes(&self, root: &Path, files: &[PathBuf]) -> Result<bool>;

    /// Commits the staged state of `files`, and nothing else, and returns
    /// the new commit id.
    fn commit(&self, root: &Path, files: &[PathBuf], message: &str, author: &Author)
        -> Result<String>;

    /// Pushes `HEAD` to `branch` on `remote` without forcing.
    fn push(&self, root: &Path, remote: &str, branch: &str) -> Result<PushOutcome>;
}

/// The default implementation of `GitOperations`, which runs the system's
/// `git` command with a per-invocation timeout.
#[derive(Debug, Clone)]
pub struct DefaultGitOperations {
    timeout: Duration,
}

impl DefaultGitOperations {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Absolute top-level directory of the work tree containing `dir`.
    pub fn toplevel(&self, dir: &Path) -> Result<PathBuf> {
        crate::git::show_toplevel(dir, self.timeout)
    }
}

impl Default for DefaultGitOperations {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::defaults::GIT_TIMEOUT_SECS))
    }
}

impl GitOperations for DefaultGitOperations {
    fn resolve_commit(&self, root: &Path, rev: &str) -> Result<Option<String>> {
        crate::git::resolve_commit(root, rev, self.timeout)
    }

    fn first_parent(&self, root: &Path, commit: &str) -> Result<Option<String>> {
        crate::git::first_parent(root, commit, self.timeout)
    }

    fn changed_paths(
        &self,
        root: &Path,
        from: &str,
        to: &str,
        extension: &str,
    ) -> Result<Vec<PathBuf>> {
        crate::git::diff_names(root, from, to, extension, self.timeout)
    }

    fn tree_paths(&self, root: &Path, commit: &str) -> Result<Vec<PathBuf>> {
        crate::git::tree_names(root, commit, self.timeout)
    }

    fn stage(&self, root: &Path, files: &[PathBuf]) -> Result<()> {
        crate::git::add(root, files, self.timeout)
    }

    fn has_staged_changes(&self, root: &Path, files: &[PathBuf]) -> Result<bool> {
        crate::git::has_staged_changes(root, files, self.timeout)
    }

    fn commit(
        &self,
        root: &Path,
        files: &[PathBuf],
        message: &str,
        author: &Author,
    ) -> Result<String> {
        crate::git::commit(root, files, message, &author.name, &author.email, self.timeout)
    }

    fn push(&self, root: &Path, remote: &str, branch: &str) -> Result<PushOutcome> {
        crate::git::push(root, remote, branch, self.timeout)
    }
}
