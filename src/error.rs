//! # Error Handling
//!
//! This module defines the centralized error type for `nb-mirror`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! the pipeline can surface, each with a descriptive message.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. The first group of variants is the pipeline's
//!   own taxonomy (path traversal, malformed events, conversion failures,
//!   degraded change detection, push conflicts). The second group wraps
//!   failures from the environment: git invocations, configuration files,
//!   I/O and parsing.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Every variant is fatal to the current invocation. Only `PushConflict` is
//! meant to be retried, and only by re-running the whole pipeline from a
//! fresh checkout.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for nb-mirror operations
#[derive(Error, Debug)]
pub enum Error {
    /// A notebook path (or the configured output directory) resolves outside
    /// the repository root.
    #[error("Path traversal rejected: {} escapes repository root {}", path.display(), root.display())]
    PathTraversal { path: PathBuf, root: PathBuf },

    /// A recognized event kind is missing a required revision field, or a
    /// field is present but not a valid revision identifier.
    #[error("Malformed {event} event: {message}")]
    MalformedEvent { event: String, message: String },

    /// The event name is not one the pipeline knows how to resolve.
    #[error("Unsupported event kind: {event}")]
    UnsupportedEvent { event: String },

    /// A single notebook could not be converted.
    #[error("Conversion failed for {}: {message}", path.display())]
    Conversion { path: PathBuf, message: String },

    /// Every change-detection strategy was exhausted without producing a
    /// baseline to diff against.
    #[error("Change detection failed between {before} and {after}: {message}")]
    ChangeDetectionDegraded {
        before: String,
        after: String,
        message: String,
    },

    /// The remote branch moved since checkout; the push was rejected.
    #[error("Push to {remote}/{branch} rejected, remote has diverged: {message}\n  hint: re-run the pipeline from a fresh checkout")]
    PushConflict {
        remote: String,
        branch: String,
        message: String,
    },

    /// A git command exited unsuccessfully or could not be spawned.
    #[error("Git command failed: git {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// A git command ran longer than the configured timeout and was killed.
    #[error("Git command timed out after {seconds}s: git {command}")]
    GitTimeout { command: String, seconds: u64 },

    /// The configuration file is present but invalid.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
