//! Shared test utilities for integration and E2E tests.
//!
//! These tests run against real git repositories in temporary directories,
//! so a `git` binary must be on `PATH`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let repo = GitFixture::new();
//!     let base = repo.commit_file("README.md", "hello");
//!     let head = repo.commit_file("nb/test.ipynb", notebooks::EMPTY);
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::notebooks;
    #[allow(unused_imports)]
    pub use super::{git, push_event, pull_request_event, GitFixture};
}

/// Notebook documents for tests.
#[allow(dead_code)]
pub mod notebooks {
    pub const EMPTY: &str = r#"{"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#;

    pub const HELLO: &str = r##"{
 "cells": [
  {"cell_type": "markdown", "metadata": {}, "source": ["# Hello"]},
  {"cell_type": "code", "execution_count": 1, "metadata": {}, "outputs": [],
   "source": ["print('hello')"]}
 ],
 "metadata": {"language_info": {"name": "python"}},
 "nbformat": 4,
 "nbformat_minor": 5
}"##;

    pub const BROKEN: &str = "{ this is not json";
}

/// Run git in `dir` and return trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure(dir: &Path) {
    git(dir, &["config", "user.name", "Test Author"]);
    git(dir, &["config", "user.email", "author@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// A work tree on branch `main`, optionally with a bare `origin` remote.
pub struct GitFixture {
    temp_dir: assert_fs::TempDir,
    remote_dir: Option<assert_fs::TempDir>,
}

#[allow(dead_code)]
impl GitFixture {
    /// Create an empty repository on branch `main`.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        git(temp_dir.path(), &["init", "--quiet"]);
        git(temp_dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        configure(temp_dir.path());
        Self {
            temp_dir,
            remote_dir: None,
        }
    }

    /// Add a bare `origin` remote. Call after the first commit to publish
    /// `main` to it.
    pub fn with_remote(mut self) -> Self {
        let remote = assert_fs::TempDir::new().expect("Failed to create remote directory");
        git(remote.path(), &["init", "--quiet", "--bare"]);
        git(remote.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        let url = remote.path().to_string_lossy().to_string();
        git(self.path(), &["remote", "add", "origin", &url]);
        self.remote_dir = Some(remote);
        self
    }

    /// Work tree directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Work tree directory, canonicalized.
    pub fn root(&self) -> PathBuf {
        self.path().canonicalize().expect("Failed to canonicalize root")
    }

    pub fn remote_path(&self) -> &Path {
        self.remote_dir.as_ref().expect("fixture has no remote").path()
    }

    pub fn write(&self, path: &str, content: &str) {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    pub fn remove(&self, path: &str) {
        git(self.path(), &["rm", "--quiet", path]);
    }

    /// Stage everything and commit; returns the new commit id.
    pub fn commit_all(&self, message: &str) -> String {
        git(self.path(), &["add", "--all"]);
        git(self.path(), &["commit", "--quiet", "--allow-empty", "-m", message]);
        self.head()
    }

    /// Write one file and commit it.
    pub fn commit_file(&self, path: &str, content: &str) -> String {
        self.write(path, content);
        self.commit_all(&format!("update {}", path))
    }

    pub fn head(&self) -> String {
        git(self.path(), &["rev-parse", "HEAD"])
    }

    pub fn push_main(&self) {
        git(self.path(), &["push", "--quiet", "origin", "HEAD:refs/heads/main"]);
    }

    pub fn remote_head(&self) -> String {
        git(self.remote_path(), &["rev-parse", "refs/heads/main"])
    }

    pub fn commit_count(&self) -> usize {
        git(self.path(), &["rev-list", "--count", "HEAD"])
            .parse()
            .expect("rev-list --count is a number")
    }

    /// Files touched by the HEAD commit.
    pub fn head_files(&self) -> Vec<String> {
        git(
            self.path(),
            &["show", "--name-only", "--pretty=format:", "-z", "HEAD"],
        )
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
    }

    /// Push a commit to the remote's `main` from a separate clone, so the
    /// fixture's checkout falls behind.
    pub fn advance_remote(&self, path: &str, content: &str) {
        let other = assert_fs::TempDir::new().expect("Failed to create clone directory");
        let url = self.remote_path().to_string_lossy().to_string();
        git(other.path(), &["clone", "--quiet", &url, "."]);
        configure(other.path());
        other.child(path).write_str(content).expect("Failed to write file");
        git(other.path(), &["add", "--all"]);
        git(other.path(), &["commit", "--quiet", "-m", "concurrent change"]);
        git(other.path(), &["push", "--quiet", "origin", "HEAD:refs/heads/main"]);
    }

    /// Install a `pre-receive` hook on the remote that refuses every push.
    #[cfg(unix)]
    pub fn decline_pushes(&self) {
        use std::os::unix::fs::PermissionsExt;
        let hook = self.remote_path().join("hooks/pre-receive");
        std::fs::create_dir_all(hook.parent().expect("hook has a parent"))
            .expect("Failed to create hooks directory");
        std::fs::write(&hook, "#!/bin/sh\necho 'protected branch' >&2\nexit 1\n")
            .expect("Failed to write hook");
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make hook executable");
    }

    /// Write an event payload file and return its path.
    pub fn event_file(&self, name: &str, payload: &str) -> PathBuf {
        let dir = self.temp_dir.child(".git/test-events");
        dir.create_dir_all().expect("Failed to create event directory");
        let file = dir.child(name);
        file.write_str(payload).expect("Failed to write event");
        file.path().to_path_buf()
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A push event payload for `refs/heads/<branch>`.
#[allow(dead_code)]
pub fn push_event(before: &str, after: &str, branch: &str) -> String {
    format!(
        r#"{{"before": "{}", "after": "{}", "ref": "refs/heads/{}",
            "repository": {{"full_name": "owner/repo"}}}}"#,
        before, after, branch
    )
}

/// A pull-request event payload whose head lives in `head_repo`.
#[allow(dead_code)]
pub fn pull_request_event(base: &str, head: &str, head_repo: &str) -> String {
    format!(
        r#"{{"pull_request": {{
            "base": {{"sha": "{}", "ref": "main", "repo": {{"full_name": "owner/repo"}}}},
            "head": {{"sha": "{}", "ref": "main", "repo": {{"full_name": "{}"}}}}}},
            "repository": {{"full_name": "owner/repo"}}}}"#,
        base, head, head_repo
    )
}
