//! In-memory `GitOperations` used by unit tests.
//!
//! Commits form a first-parent chain of full trees. Forgetting a commit
//! removes it from "local history", which is how tests model shallow clones
//! and rewritten history. Staging reads files from the real work tree under
//! `root`, so publishing tests write artifacts to a temp dir as usual.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Author;
use crate::error::{Error, Result};
use crate::repository::{GitOperations, PushOutcome};

type Tree = BTreeMap<PathBuf, Vec<u8>>;

#[derive(Debug, Clone)]
struct FakeCommit {
    parent: Option<String>,
    tree: Tree,
}

/// How the fake remote answers the next pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBehavior {
    Accept,
    Diverged,
    Unreachable,
}

#[derive(Debug)]
struct State {
    commits: HashMap<String, FakeCommit>,
    head: Option<String>,
    index: Tree,
    remote_head: Option<String>,
    remote: RemoteBehavior,
    counter: u64,
    calls: Vec<String>,
}

#[derive(Debug)]
pub struct FakeGit {
    state: Mutex<State>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                commits: HashMap::new(),
                head: None,
                index: Tree::new(),
                remote_head: None,
                remote: RemoteBehavior::Accept,
                counter: 0,
                calls: Vec::new(),
            }),
        }
    }

    /// Create a commit on top of HEAD. `Some(content)` writes a file, `None`
    /// deletes it. Returns the new commit id.
    pub fn commit_files(&self, changes: &[(&str, Option<&str>)]) -> String {
        let mut state = self.state.lock().unwrap();
        let mut tree = state
            .head
            .as_ref()
            .map(|h| state.commits[h].tree.clone())
            .unwrap_or_default();
        for (path, content) in changes {
            match content {
                Some(content) => {
                    tree.insert(PathBuf::from(path), content.as_bytes().to_vec());
                }
                None => {
                    tree.remove(Path::new(path));
                }
            }
        }
        Self::record(&mut state, tree)
    }

    fn record(state: &mut State, tree: Tree) -> String {
        state.counter += 1;
        let id = format!("{:040x}", state.counter);
        let parent = state.head.clone();
        state.commits.insert(
            id.clone(),
            FakeCommit {
                parent,
                tree: tree.clone(),
            },
        );
        state.head = Some(id.clone());
        state.index = tree;
        id
    }

    /// Drop a commit object from local history.
    pub fn forget(&self, commit: &str) {
        self.state.lock().unwrap().commits.remove(commit);
    }

    pub fn set_remote(&self, behavior: RemoteBehavior) {
        self.state.lock().unwrap().remote = behavior;
    }

    pub fn head(&self) -> Option<String> {
        self.state.lock().unwrap().head.clone()
    }

    pub fn remote_head(&self) -> Option<String> {
        self.state.lock().unwrap().remote_head.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits.len()
    }

    /// Names of the trait methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn head_tree(state: &State) -> Tree {
        state
            .head
            .as_ref()
            .map(|h| state.commits[h].tree.clone())
            .unwrap_or_default()
    }

    fn tree_of(state: &State, rev: &str) -> Result<Tree> {
        let id = Self::lookup(state, rev).ok_or_else(|| Error::GitCommand {
            command: format!("rev-parse {}", rev),
            stderr: format!("fatal: bad object {}", rev),
        })?;
        Ok(state.commits[&id].tree.clone())
    }

    fn lookup(state: &State, rev: &str) -> Option<String> {
        let id = if rev == "HEAD" {
            state.head.clone()?
        } else {
            rev.to_string()
        };
        state.commits.contains_key(&id).then_some(id)
    }
}

impl GitOperations for FakeGit {
    fn resolve_commit(&self, _root: &Path, rev: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("resolve_commit".to_string());
        Ok(Self::lookup(&state, rev))
    }

    fn first_parent(&self, _root: &Path, commit: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("first_parent".to_string());
        Ok(state
            .commits
            .get(commit)
            .and_then(|c| c.parent.clone())
            .filter(|p| state.commits.contains_key(p)))
    }

    fn changed_paths(
        &self,
        _root: &Path,
        from: &str,
        to: &str,
        extension: &str,
    ) -> Result<Vec<PathBuf>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("changed_paths".to_string());
        let old = Self::tree_of(&state, from)?;
        let new = Self::tree_of(&state, to)?;
        Ok(new
            .iter()
            .filter(|(path, content)| old.get(*path) != Some(*content))
            .map(|(path, _)| path.clone())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(extension))
            .collect())
    }

    fn tree_paths(&self, _root: &Path, commit: &str) -> Result<Vec<PathBuf>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("tree_paths".to_string());
        Ok(Self::tree_of(&state, commit)?.into_keys().collect())
    }

    fn stage(&self, root: &Path, files: &[PathBuf]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("stage".to_string());
        for file in files {
            match std::fs::read(root.join(file)) {
                Ok(content) => {
                    state.index.insert(file.clone(), content);
                }
                Err(_) => {
                    state.index.remove(file);
                }
            }
        }
        Ok(())
    }

    fn has_staged_changes(&self, _root: &Path, files: &[PathBuf]) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("has_staged_changes".to_string());
        let head_tree = Self::head_tree(&state);
        Ok(files
            .iter()
            .any(|file| head_tree.get(file) != state.index.get(file)))
    }

    fn commit(
        &self,
        _root: &Path,
        files: &[PathBuf],
        _message: &str,
        _author: &Author,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("commit".to_string());
        let mut tree = Self::head_tree(&state);
        for file in files {
            match state.index.get(file) {
                Some(content) => {
                    tree.insert(file.clone(), content.clone());
                }
                None => {
                    tree.remove(file);
                }
            }
        }
        let index = state.index.clone();
        let id = Self::record(&mut state, tree);
        state.index = index;
        Ok(id)
    }

    fn push(&self, _root: &Path, remote: &str, branch: &str) -> Result<PushOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("push".to_string());
        match state.remote {
            RemoteBehavior::Accept => {
                if state.remote_head == state.head {
                    Ok(PushOutcome::UpToDate)
                } else {
                    state.remote_head = state.head.clone();
                    Ok(PushOutcome::Pushed)
                }
            }
            RemoteBehavior::Diverged => Err(Error::PushConflict {
                remote: remote.to_string(),
                branch: branch.to_string(),
                message: "[rejected] (fetch first)".to_string(),
            }),
            RemoteBehavior::Unreachable => Err(Error::GitCommand {
                command: format!("push --porcelain {} HEAD:refs/heads/{}", remote, branch),
                stderr: "fatal: could not read from remote repository".to_string(),
            }),
        }
    }
}
