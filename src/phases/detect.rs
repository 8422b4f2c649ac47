//! Phase 1: Change Detection
//!
//! Determines which notebooks changed between the two revisions of a CI
//! event. Detection is an ordered chain of strategies; each one either
//! produces a [`ChangeSet`], declines because it does not apply, or reports
//! that its input is unavailable so the next strategy can try.
//!
//! ## Strategies, in order
//!
//! 1.  **First push**: `before` is the zero sentinel. There is no baseline,
//!     so the result is empty rather than every notebook in the repository.
//!
//! 2.  **Direct diff**: both revisions are in local history. The net diff
//!     `before..after` is authoritative: a notebook added and removed again
//!     inside the range does not appear.
//!
//! 3.  **Ancestor walk**: `before` is missing locally (shallow clone,
//!     force-pushed history, synthetic id). Walk `after`'s first-parent chain
//!     down to the root or shallow boundary (or at most `fallback_depth`
//!     commits when a cap is configured), union each commit's own notebook
//!     changes (the boundary commit contributes its whole tree), then keep
//!     only paths that still exist at `after`. This over-reports rather than
//!     drops notebooks.
//!
//! If no strategy produces a result, detection fails with
//! [`Error::ChangeDetectionDegraded`].
//!
//! All paths come back absolute (joined onto the repository root) and are
//! read from NUL-separated git output, so non-ASCII names and names with
//! characters like `<` or `>` are returned literally.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::ChangeSet;
use crate::error::{Error, Result};
use crate::event::{Revision, RevisionPair};
use crate::repository::GitOperations;

/// Why a strategy did not produce a change set.
#[derive(Debug)]
pub enum DetectionError {
    /// The strategy's precondition does not hold for these revisions.
    NotApplicable,
    /// The strategy applies but its input is missing from local history.
    Unavailable(String),
    /// A failure no later strategy could recover from.
    Fatal(Error),
}

impl From<Error> for DetectionError {
    fn from(error: Error) -> Self {
        DetectionError::Fatal(error)
    }
}

/// Everything a strategy may look at.
pub struct DetectionContext<'a> {
    pub git: &'a dyn GitOperations,
    pub root: &'a Path,
    pub revisions: &'a RevisionPair,
    pub extension: &'a str,
    /// Optional cap on the commits the ancestor walk visits.
    pub fallback_depth: Option<usize>,
}

impl DetectionContext<'_> {
    fn has_extension(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension)
    }

    fn absolute(&self, paths: impl IntoIterator<Item = PathBuf>) -> ChangeSet {
        paths
            .into_iter()
            .filter(|p| self.has_extension(p))
            .map(|p| self.root.join(p))
            .collect()
    }
}

/// One way of producing a change set.
pub trait DetectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, ctx: &DetectionContext<'_>) -> std::result::Result<ChangeSet, DetectionError>;
}

/// Strategy 1: no prior revision means nothing to compare against.
pub struct FirstPush;

impl DetectionStrategy for FirstPush {
    fn name(&self) -> &'static str {
        "first-push"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> std::result::Result<ChangeSet, DetectionError> {
        if ctx.revisions.is_first_push() {
            Ok(ChangeSet::new())
        } else {
            Err(DetectionError::NotApplicable)
        }
    }
}

/// Strategy 2: net diff between two locally available revisions.
pub struct DirectDiff;

impl DetectionStrategy for DirectDiff {
    fn name(&self) -> &'static str {
        "direct-diff"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> std::result::Result<ChangeSet, DetectionError> {
        let RevisionPair { before, after } = ctx.revisions;

        let before = ctx
            .git
            .resolve_commit(ctx.root, before.as_str())?
            .ok_or_else(|| {
                DetectionError::Unavailable(format!("before {} is not in local history", before))
            })?;
        let after = ctx
            .git
            .resolve_commit(ctx.root, after.as_str())?
            .ok_or_else(|| {
                DetectionError::Unavailable(format!("after {} is not in local history", after))
            })?;

        match ctx.git.changed_paths(ctx.root, &before, &after, ctx.extension) {
            Ok(paths) => Ok(ctx.absolute(paths)),
            Err(Error::GitCommand { stderr, .. }) => Err(DetectionError::Unavailable(stderr)),
            Err(other) => Err(DetectionError::Fatal(other)),
        }
    }
}

/// Strategy 3: rebuild the range from `after`'s own ancestry.
pub struct AncestorWalk;

impl DetectionStrategy for AncestorWalk {
    fn name(&self) -> &'static str {
        "ancestor-walk"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> std::result::Result<ChangeSet, DetectionError> {
        let after = ctx
            .git
            .resolve_commit(ctx.root, ctx.revisions.after.as_str())?
            .ok_or_else(|| {
                DetectionError::Unavailable(format!(
                    "after {} is not in local history, no baseline can be derived",
                    ctx.revisions.after
                ))
            })?;

        let mut union: BTreeSet<PathBuf> = BTreeSet::new();
        let mut commit = after.clone();
        let mut walked = 0;

        loop {
            if let Some(cap) = ctx.fallback_depth {
                if walked >= cap.max(1) {
                    debug!("Ancestor walk stopped at configured depth {}", cap);
                    break;
                }
            }
            walked += 1;
            match ctx.git.first_parent(ctx.root, &commit)? {
                Some(parent) => {
                    union.extend(ctx.git.changed_paths(ctx.root, &parent, &commit, ctx.extension)?);
                    commit = parent;
                }
                None => {
                    debug!("Reached history boundary at {}", commit);
                    union.extend(ctx.git.tree_paths(ctx.root, &commit)?);
                    break;
                }
            }
        }

        // The per-commit union only discovers candidates; the tree at
        // `after` decides which of them still exist.
        let surviving: BTreeSet<PathBuf> = ctx.git.tree_paths(ctx.root, &after)?.into_iter().collect();
        debug!(
            "Ancestor walk covered {} commit(s) from {}, {} candidate path(s)",
            walked,
            after,
            union.len()
        );

        Ok(ctx.absolute(union.into_iter().filter(|p| surviving.contains(p))))
    }
}

/// How a detection result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// First push to the ref; the change set is empty by definition.
    FirstPush,
    /// Exact net diff between the two revisions.
    Exact,
    /// `before` was unavailable; the change set was rebuilt from history.
    Degraded,
}

/// Result of running the strategy chain.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub strategy: &'static str,
    pub outcome: DetectionOutcome,
    pub changes: ChangeSet,
}

/// Ordered chain of detection strategies.
pub struct ChangeDetector {
    strategies: Vec<Box<dyn DetectionStrategy>>,
    extension: String,
    fallback_depth: Option<usize>,
}

impl ChangeDetector {
    /// The standard chain: first push, direct diff, ancestor walk.
    ///
    /// Without a `fallback_depth` the ancestor walk covers all of `after`'s
    /// locally available first-parent history.
    pub fn new(extension: &str, fallback_depth: Option<usize>) -> Self {
        Self {
            strategies: vec![Box::new(FirstPush), Box::new(DirectDiff), Box::new(AncestorWalk)],
            extension: extension.to_string(),
            fallback_depth,
        }
    }

    /// A chain with custom strategies, tried in the given order.
    pub fn with_strategies(
        strategies: Vec<Box<dyn DetectionStrategy>>,
        extension: &str,
        fallback_depth: Option<usize>,
    ) -> Self {
        Self {
            strategies,
            extension: extension.to_string(),
            fallback_depth,
        }
    }

    /// Run the chain until a strategy produces a change set.
    pub fn detect(
        &self,
        git: &dyn GitOperations,
        root: &Path,
        revisions: &RevisionPair,
    ) -> Result<DetectionReport> {
        let ctx = DetectionContext {
            git,
            root,
            revisions,
            extension: &self.extension,
            fallback_depth: self.fallback_depth,
        };

        let mut reasons = Vec::new();
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.detect(&ctx) {
                Ok(changes) => {
                    let outcome = if revisions.is_first_push() {
                        DetectionOutcome::FirstPush
                    } else if reasons.is_empty() || index == 0 {
                        DetectionOutcome::Exact
                    } else {
                        DetectionOutcome::Degraded
                    };
                    if outcome == DetectionOutcome::Degraded {
                        warn!(
                            "Change detection degraded to {} ({})",
                            strategy.name(),
                            reasons.join("; ")
                        );
                    }
                    info!(
                        "Detected {} changed notebook(s) via {}",
                        changes.len(),
                        strategy.name()
                    );
                    return Ok(DetectionReport {
                        strategy: strategy.name(),
                        outcome,
                        changes,
                    });
                }
                Err(DetectionError::NotApplicable) => {
                    debug!("Strategy {} does not apply", strategy.name());
                }
                Err(DetectionError::Unavailable(reason)) => {
                    debug!("Strategy {} unavailable: {}", strategy.name(), reason);
                    reasons.push(format!("{}: {}", strategy.name(), reason));
                }
                Err(DetectionError::Fatal(error)) => return Err(error),
            }
        }

        Err(Error::ChangeDetectionDegraded {
            before: revisions.before.to_string(),
            after: revisions.after.to_string(),
            message: if reasons.is_empty() {
                "no detection strategy applied".to_string()
            } else {
                reasons.join("; ")
            },
        })
    }
}

/// Changed notebooks (`.ipynb`) between two revisions, with the standard
/// strategy chain and an uncapped fallback walk.
pub fn diff(
    git: &dyn GitOperations,
    root: &Path,
    before: &Revision,
    after: &Revision,
) -> Result<ChangeSet> {
    let revisions = RevisionPair::new(before.clone(), after.clone());
    ChangeDetector::new(crate::defaults::NOTEBOOK_EXTENSION, None)
        .detect(git, root, &revisions)
        .map(|report| report.changes)
}
