//! Implementation of the 4 phases of an nb-mirror run.
//!
//! ## Overview
//!
//! A run follows 4 phases:
//! 1. Change Detection - Find the notebooks that differ between the event's revisions
//! 2. Conversion - Map each changed notebook to its artifact path and convert it
//! 3. Publishing - Stage the artifacts, commit if anything changed, push
//! 4. Orchestration - Resolve the event and drive phases 1-3
//!
//! Each phase depends only on the previous phases and the foundation layers
//! (`path`, `event`, `repository`, `converter`).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// Phase modules
pub mod convert;
pub mod detect;
pub mod orchestrator;
pub mod publish;

pub use convert as phase2;
pub use detect as phase1;
pub use publish as phase3;

/// Deduplicated, ordered set of absolute notebook paths changed by a run.
///
/// Created fresh per invocation and consumed by the conversion phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeSet<PathBuf>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path; returns false if it was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.paths.into_iter().collect()
    }
}

impl FromIterator<PathBuf> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ChangeSet {
    type Item = PathBuf;
    type IntoIter = std::collections::btree_set::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}
