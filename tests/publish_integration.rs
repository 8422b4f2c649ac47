//! Publishing against a real work tree and a bare remote.

mod common;

use common::prelude::*;
use nb_mirror::config::{Author, Config};
use nb_mirror::error::Error;
use nb_mirror::phases::publish::{PublishOutcome, Publisher};
use nb_mirror::repository::DefaultGitOperations;
use std::path::PathBuf;

fn published_repo() -> GitFixture {
    let repo = GitFixture::new().with_remote();
    repo.commit_file("README.md", "base\n");
    repo.push_main();
    repo
}

#[test]
fn test_publish_pushes_commit_with_automation_author() {
    let repo = published_repo();
    repo.write("artifacts/gha-nbconvert/nb/test.py", "print('hi')\n");
    let git = DefaultGitOperations::default();
    let author = Author {
        name: "nb-bot".to_string(),
        email: "nb-bot@example.com".to_string(),
    };

    let outcome = Publisher::new(&git, "origin", author, "Update scripts")
        .publish(
            &repo.root(),
            &[PathBuf::from("artifacts/gha-nbconvert/nb/test.py")],
            "main",
        )
        .unwrap();

    let head = repo.head();
    assert_eq!(outcome, PublishOutcome::Pushed { commit: head.clone() });
    assert_eq!(repo.remote_head(), head);
    assert_eq!(
        common::git(repo.path(), &["log", "-1", "--format=%an <%ae>|%s"]),
        "nb-bot <nb-bot@example.com>|Update scripts"
    );
}

#[test]
fn test_publish_twice_makes_one_commit() {
    let repo = published_repo();
    repo.write("artifacts/gha-nbconvert/a.py", "a = 1\n");
    let git = DefaultGitOperations::default();
    let publisher = Publisher::from_config(&git, &Config::default());
    let files = [repo.root().join("artifacts/gha-nbconvert/a.py")];

    publisher.publish(&repo.root(), &files, "main").unwrap();
    let count = repo.commit_count();
    let second = publisher.publish(&repo.root(), &files, "main").unwrap();

    assert_eq!(second, PublishOutcome::NothingToCommit);
    assert_eq!(repo.commit_count(), count);
}

#[test]
fn test_publish_leaves_unrelated_changes_unstaged() {
    let repo = published_repo();
    repo.write("artifacts/gha-nbconvert/a.py", "a = 1\n");
    repo.write("scratch.txt", "local only\n");
    let git = DefaultGitOperations::default();

    Publisher::from_config(&git, &Config::default())
        .publish(
            &repo.root(),
            &[PathBuf::from("artifacts/gha-nbconvert/a.py")],
            "main",
        )
        .unwrap();

    assert_eq!(repo.head_files(), vec!["artifacts/gha-nbconvert/a.py".to_string()]);
    let status = common::git(repo.path(), &["status", "--porcelain"]);
    assert!(status.contains("?? scratch.txt"));
}

#[test]
fn test_publish_diverged_remote_is_push_conflict() {
    let repo = published_repo();
    repo.advance_remote("CHANGELOG.md", "someone else\n");
    let remote_before = repo.remote_head();
    repo.write("artifacts/gha-nbconvert/a.py", "a = 1\n");
    let git = DefaultGitOperations::default();

    let err = Publisher::from_config(&git, &Config::default())
        .publish(
            &repo.root(),
            &[PathBuf::from("artifacts/gha-nbconvert/a.py")],
            "main",
        )
        .unwrap_err();

    assert!(matches!(err, Error::PushConflict { .. }), "got {err}");
    assert_eq!(repo.remote_head(), remote_before);
}

#[test]
fn test_publish_to_missing_remote_is_git_error() {
    let repo = GitFixture::new();
    repo.commit_file("README.md", "base\n");
    repo.write("out/a.py", "a = 1\n");
    let git = DefaultGitOperations::default();

    let err = Publisher::from_config(&git, &Config::default())
        .publish(&repo.root(), &[PathBuf::from("out/a.py")], "main")
        .unwrap_err();
    assert!(matches!(err, Error::GitCommand { .. }), "got {err}");
}

#[test]
fn test_publish_commits_only_artifacts_when_index_has_other_paths() {
    let repo = published_repo();
    repo.write("staged.txt", "someone else's work\n");
    common::git(repo.path(), &["add", "staged.txt"]);
    repo.write("artifacts/gha-nbconvert/a.py", "a = 1\n");
    let git = DefaultGitOperations::default();

    Publisher::from_config(&git, &Config::default())
        .publish(
            &repo.root(),
            &[PathBuf::from("artifacts/gha-nbconvert/a.py")],
            "main",
        )
        .unwrap();

    assert_eq!(repo.head_files(), vec!["artifacts/gha-nbconvert/a.py".to_string()]);
    let status = common::git(repo.path(), &["status", "--porcelain"]);
    assert!(status.contains("A  staged.txt"), "status: {status}");
}

#[cfg(unix)]
#[test]
fn test_publish_refused_by_remote_hook_is_git_error() {
    let repo = published_repo();
    repo.decline_pushes();
    let remote_before = repo.remote_head();
    repo.write("artifacts/gha-nbconvert/a.py", "a = 1\n");
    let git = DefaultGitOperations::default();

    let err = Publisher::from_config(&git, &Config::default())
        .publish(
            &repo.root(),
            &[PathBuf::from("artifacts/gha-nbconvert/a.py")],
            "main",
        )
        .unwrap_err();

    match err {
        Error::GitCommand { stderr, .. } => assert!(stderr.contains("remote rejected"), "stderr: {stderr}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.remote_head(), remote_before);
}
