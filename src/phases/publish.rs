//! Phase 3: Publishing
//!
//! Stages exactly the artifacts the conversion phase wrote, commits them with
//! the automation identity when they differ from `HEAD`, and pushes the
//! commit to the event's branch. Re-running on an unchanged tree is a no-op:
//! nothing is staged as different, so no commit and no push happen.
//!
//! The push is never forced. If the remote branch moved since the run
//! checked out, the push is rejected and surfaces as
//! [`crate::error::Error::PushConflict`]; the run must be retried from a fresh checkout.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::{Author, Config};
use crate::error::Result;
use crate::path;
use crate::repository::{GitOperations, PushOutcome};

/// What a publish attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The staged artifacts match `HEAD`; nothing was committed or pushed.
    NothingToCommit,
    /// A new commit was created and pushed.
    Pushed { commit: String },
    /// A commit was created but the remote already had it.
    AlreadyUpToDate { commit: String },
}

/// Commits and pushes generated artifacts.
pub struct Publisher<'a> {
    git: &'a dyn GitOperations,
    remote: String,
    author: Author,
    message: String,
}

impl<'a> Publisher<'a> {
    pub fn new(git: &'a dyn GitOperations, remote: &str, author: Author, message: &str) -> Self {
        Self {
            git,
            remote: remote.to_string(),
            author,
            message: message.to_string(),
        }
    }

    /// A publisher using the remote, identity and message from `config`.
    pub fn from_config(git: &'a dyn GitOperations, config: &Config) -> Self {
        Self::new(git, &config.remote, config.author.clone(), &config.commit_message)
    }

    /// Stage `files`, commit them if they differ from `HEAD`, and push to
    /// `branch`. Other paths already in the index are left staged and
    /// uncommitted.
    ///
    /// `files` may be absolute (under `root`) or repository-relative; any
    /// path outside `root` is rejected before git is touched.
    pub fn publish(&self, root: &Path, files: &[PathBuf], branch: &str) -> Result<PublishOutcome> {
        let relative = files
            .iter()
            .map(|f| path::relative_to_root(f, root))
            .collect::<Result<Vec<_>>>()?;

        if relative.is_empty() {
            info!("No artifacts to publish");
            return Ok(PublishOutcome::NothingToCommit);
        }

        self.git.stage(root, &relative)?;
        if !self.git.has_staged_changes(root, &relative)? {
            info!("Artifacts already up to date, nothing to commit");
            return Ok(PublishOutcome::NothingToCommit);
        }

        if let Some(parent) = self.git.resolve_commit(root, "HEAD")? {
            debug!("Committing on top of {}", parent);
        }
        let commit = self.git.commit(root, &relative, &self.message, &self.author)?;
        info!("Committed {} artifact(s) as {}", relative.len(), commit);

        match self.git.push(root, &self.remote, branch)? {
            PushOutcome::Pushed => {
                info!("Pushed {} to {}/{}", commit, self.remote, branch);
                Ok(PublishOutcome::Pushed { commit })
            }
            PushOutcome::UpToDate => {
                info!("Remote {}/{} already up to date", self.remote, branch);
                Ok(PublishOutcome::AlreadyUpToDate { commit })
            }
        }
    }
}
