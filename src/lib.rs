//! # nb-mirror Library
//!
//! This library keeps a plain-text mirror of a repository's notebooks in
//! sync from CI. For every push or pull-request event it finds the notebooks
//! that changed, renders each one to a deterministic text artifact under a
//! dedicated output directory, and commits the artifacts back to the branch
//! that triggered the run. It is designed to be used by the `nb-mirror`
//! command-line tool but the pipeline can be driven directly.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::Path;
//! use nb_mirror::path::map_to_artifact;
//!
//! let artifact = map_to_artifact(
//!     Path::new("/repo/nb/test.ipynb"),
//!     Path::new("/repo"),
//!     Path::new("artifacts/gha-nbconvert"),
//!     "py",
//! )
//! .unwrap();
//! assert_eq!(artifact, Path::new("/repo/artifacts/gha-nbconvert/nb/test.py"));
//!
//! // Paths that leave the repository root are rejected
//! assert!(map_to_artifact(
//!     Path::new("/repo/../evil.ipynb"),
//!     Path::new("/repo"),
//!     Path::new("artifacts/gha-nbconvert"),
//!     "py",
//! )
//! .is_err());
//! ```
//!
//! ## Core Concepts
//!
//! - **Path Mapper (`path`)**: Maps notebook paths to artifact paths and
//!   guarantees nothing escapes the repository root.
//! - **Revision Resolver (`event`)**: Reads the CI event payload into a
//!   revision pair, the target branch, and fork provenance.
//! - **Revision Control (`repository`, `git`)**: The `GitOperations` trait and
//!   its implementation over the system `git` binary.
//! - **Converter (`converter`)**: The `NotebookConverter` capability and the
//!   built-in script renderer.
//! - **Phases (`phases`)**: Change detection, conversion, publishing, and the
//!   orchestrator tying them together.
//! - **Configuration (`config`, `defaults`)**: The optional `.nb-mirror.yaml`.
//!
//! ## Execution Flow
//!
//! 1.  **Resolve**: Turn the event payload into `(before, after)` revisions.
//! 2.  **Detect**: Diff the revisions for changed notebooks, falling back to
//!     a walk of local history when `before` is unavailable.
//! 3.  **Convert**: Render each changed notebook to its mirrored artifact.
//! 4.  **Publish**: Stage exactly those artifacts, commit if anything
//!     changed, and push without forcing.

pub mod config;
pub mod converter;
pub mod defaults;
pub mod error;
pub mod event;
pub mod git;
pub mod output;
pub mod path;
pub mod phases;
pub mod repository;

#[cfg(test)]
mod fake_git;
#[cfg(test)]
mod path_proptest;
