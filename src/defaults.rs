//! Default values for nb-mirror configuration.
//!
//! This module provides centralized default values used by the configuration
//! layer and the commands, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the optional configuration file at the repository root.
pub const CONFIG_FILE_NAME: &str = ".nb-mirror.yaml";

/// Directory (relative to the repository root) that mirrors the notebook tree.
pub const OUTPUT_DIR: &str = "artifacts/gha-nbconvert";

/// Extension of the source notebook files.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Extension of the generated plain-text artifacts.
pub const ARTIFACT_EXTENSION: &str = "py";

/// Remote the publisher pushes to.
pub const REMOTE: &str = "origin";

/// Author name used for automation commits.
pub const AUTHOR_NAME: &str = "github-actions[bot]";

/// Author email used for automation commits.
pub const AUTHOR_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";

/// Commit message used for automation commits.
pub const COMMIT_MESSAGE: &str = "Update paired notebook scripts";

/// Process-level timeout for a single git invocation.
pub const GIT_TIMEOUT_SECS: u64 = 120;

/// Returns the default repository root.
///
/// Prefers `GITHUB_WORKSPACE` when running inside GitHub Actions and falls
/// back to the current directory otherwise.
pub fn default_repository_root() -> PathBuf {
    std::env::var_os("GITHUB_WORKSPACE")
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
