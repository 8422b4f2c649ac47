//! Thin wrappers around the system `git` command.
//!
//! Every invocation runs with an explicit working directory (never the
//! process's current directory), a process-level timeout, and
//! `core.quotepath=false`. Path lists are always requested NUL-separated
//! (`-z`) so filenames with non-ASCII or shell-special characters come back
//! verbatim instead of C-quoted.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished git process.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

fn describe<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn read_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run `git <args>` inside `root`, killing it if it outlives `timeout`.
///
/// A non-zero exit is not an error at this level; callers decide what each
/// exit code means for their command.
pub fn run<S: AsRef<OsStr>>(root: &Path, args: &[S], timeout: Duration) -> Result<GitOutput> {
    let command = describe(args);
    trace!("git {} (in {})", command, root.display());

    let mut child = Command::new("git")
        .current_dir(root)
        .args(["-c", "core.quotepath=false"])
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            stderr: e.to_string(),
        })?;

    let stdout = read_pipe(child.stdout.take());
    let stderr = read_pipe(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::GitTimeout {
                command,
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = GitOutput {
        code: status.code(),
        stdout: stdout.join().unwrap_or_default(),
        stderr: String::from_utf8_lossy(&stderr.join().unwrap_or_default())
            .trim()
            .to_string(),
    };
    debug!("git {} exited with {:?}", command, output.code);
    Ok(output)
}

/// Run a git command and fail unless it exits zero.
pub fn run_checked<S: AsRef<OsStr>>(
    root: &Path,
    args: &[S],
    timeout: Duration,
) -> Result<GitOutput> {
    let output = run(root, args, timeout)?;
    if output.success() {
        Ok(output)
    } else {
        Err(Error::GitCommand {
            command: describe(args),
            stderr: output.stderr,
        })
    }
}

/// Split NUL-terminated git output into paths, preserving raw bytes.
pub fn split_nul_paths(bytes: &[u8]) -> Vec<PathBuf> {
    bytes
        .split(|b| *b == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(bytes_to_path)
        .collect()
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Absolute path of the work tree containing `dir`.
pub fn show_toplevel(dir: &Path, timeout: Duration) -> Result<PathBuf> {
    let output = run_checked(dir, &["rev-parse", "--show-toplevel"], timeout)?;
    Ok(PathBuf::from(output.stdout_text()))
}

/// Resolve `rev` to a commit id, or `None` if it is not in local history.
pub fn resolve_commit(root: &Path, rev: &str, timeout: Duration) -> Result<Option<String>> {
    let spec = format!("{}^{{commit}}", rev);
    let args = ["rev-parse", "--verify", "--quiet", spec.as_str()];
    let output = run(root, &args, timeout)?;

    if output.success() {
        Ok(Some(output.stdout_text()))
    } else if output.stderr.is_empty() {
        // --quiet suppresses messages for unknown revisions only
        Ok(None)
    } else {
        Err(Error::GitCommand {
            command: describe(&args),
            stderr: output.stderr,
        })
    }
}

/// First parent of `commit`, `None` for root commits and shallow boundaries.
pub fn first_parent(root: &Path, commit: &str, timeout: Duration) -> Result<Option<String>> {
    resolve_commit(root, &format!("{}^1", commit), timeout)
}

/// Paths added or modified between two commits (deletions excluded, renames
/// split into delete + add), limited to files ending in `.extension`.
pub fn diff_names(
    root: &Path,
    from: &str,
    to: &str,
    extension: &str,
    timeout: Duration,
) -> Result<Vec<PathBuf>> {
    let pathspec = format!("*.{}", extension);
    let args = [
        "diff",
        "--name-only",
        "-z",
        "--no-renames",
        "--diff-filter=d",
        from,
        to,
        "--",
        pathspec.as_str(),
    ];
    let output = run_checked(root, &args, timeout)?;
    Ok(split_nul_paths(&output.stdout))
}

/// Every tracked path in `commit`'s tree.
pub fn tree_names(root: &Path, commit: &str, timeout: Duration) -> Result<Vec<PathBuf>> {
    let args = ["ls-tree", "-r", "-z", "--name-only", "--full-tree", commit];
    let output = run_checked(root, &args, timeout)?;
    Ok(split_nul_paths(&output.stdout))
}

/// Stage exactly `files` (repository-relative).
pub fn add(root: &Path, files: &[PathBuf], timeout: Duration) -> Result<()> {
    let mut args: Vec<&OsStr> = vec![OsStr::new("add"), OsStr::new("--")];
    args.extend(files.iter().map(|f| f.as_os_str()));
    run_checked(root, args.as_slice(), timeout)?;
    Ok(())
}

/// Whether the index differs from `HEAD` for any of `files`.
pub fn has_staged_changes(root: &Path, files: &[PathBuf], timeout: Duration) -> Result<bool> {
    let mut args: Vec<&OsStr> = ["diff", "--cached", "--quiet", "--exit-code", "--"]
        .into_iter()
        .map(OsStr::new)
        .collect();
    args.extend(files.iter().map(|f| f.as_os_str()));
    let output = run(root, args.as_slice(), timeout)?;
    match output.code {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(Error::GitCommand {
            command: describe(args.as_slice()),
            stderr: output.stderr,
        }),
    }
}

/// Commit `files` as `name <email>` and return the new commit id.
///
/// Only the named paths are committed; anything else already in the index
/// stays staged.
pub fn commit(
    root: &Path,
    files: &[PathBuf],
    message: &str,
    name: &str,
    email: &str,
    timeout: Duration,
) -> Result<String> {
    let user_name = format!("user.name={}", name);
    let user_email = format!("user.email={}", email);
    let mut args: Vec<&OsStr> = [
        "-c",
        user_name.as_str(),
        "-c",
        user_email.as_str(),
        "commit",
        "--no-verify",
        "--quiet",
        "-m",
        message,
        "--",
    ]
    .into_iter()
    .map(OsStr::new)
    .collect();
    args.extend(files.iter().map(|f| f.as_os_str()));
    run_checked(root, args.as_slice(), timeout)?;

    resolve_commit(root, "HEAD", timeout)?.ok_or_else(|| Error::GitCommand {
        command: "rev-parse HEAD".to_string(),
        stderr: "HEAD does not resolve after commit".to_string(),
    })
}

/// Per-ref status flag from `git push --porcelain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefStatus {
    FastForward,
    Forced,
    Deleted,
    Created,
    Rejected,
    UpToDate,
}

impl RefStatus {
    fn from_flag(flag: char) -> Option<Self> {
        match flag {
            ' ' => Some(Self::FastForward),
            '+' => Some(Self::Forced),
            '-' => Some(Self::Deleted),
            '*' => Some(Self::Created),
            '!' => Some(Self::Rejected),
            '=' => Some(Self::UpToDate),
            _ => None,
        }
    }
}

/// One ref line of porcelain push output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    pub status: RefStatus,
    pub refspec: String,
    pub summary: String,
}

/// Parse the ref lines of `git push --porcelain` output, ignoring the
/// `To <url>` and `Done` lines.
pub fn parse_push_porcelain(stdout: &str) -> Vec<RefUpdate> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut chars = line.chars();
            let flag = chars.next()?;
            if chars.next()? != '\t' {
                return None;
            }
            let status = RefStatus::from_flag(flag)?;
            let mut fields = line[2..].splitn(2, '\t');
            Some(RefUpdate {
                status,
                refspec: fields.next().unwrap_or_default().to_string(),
                summary: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

impl RefUpdate {
    /// Whether the remote refused the update because its ref moved on
    /// (non-fast-forward, fetch first, stale info). Server-side refusals
    /// such as hooks, branch protection or permissions report
    /// `[remote rejected]` instead and are not divergence.
    pub fn is_divergence(&self) -> bool {
        self.status == RefStatus::Rejected && self.summary.starts_with("[rejected]")
    }
}

/// Typed result of a push that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    UpToDate,
}

/// Push `HEAD` to `refs/heads/<branch>` on `remote`, never forcing.
///
/// A ref rejected because the remote moved since checkout surfaces as
/// [`Error::PushConflict`]. A ref refused by the server itself, or a failure
/// without any ref status (network, authentication, missing remote),
/// surfaces as [`Error::GitCommand`].
pub fn push(root: &Path, remote: &str, branch: &str, timeout: Duration) -> Result<PushOutcome> {
    let refspec = format!("HEAD:refs/heads/{}", branch);
    let args = ["push", "--porcelain", remote, refspec.as_str()];
    let output = run(root, &args, timeout)?;
    let updates = parse_push_porcelain(&String::from_utf8_lossy(&output.stdout));

    if let Some(rejected) = updates.iter().find(|u| u.is_divergence()) {
        return Err(Error::PushConflict {
            remote: remote.to_string(),
            branch: branch.to_string(),
            message: rejected.summary.clone(),
        });
    }

    if let Some(refused) = updates.iter().find(|u| u.status == RefStatus::Rejected) {
        let stderr = output.stderr.trim();
        return Err(Error::GitCommand {
            command: describe(&args),
            stderr: if stderr.is_empty() {
                refused.summary.clone()
            } else {
                format!("{}\n{}", refused.summary, stderr)
            },
        });
    }

    if !output.success() || updates.is_empty() {
        return Err(Error::GitCommand {
            command: describe(&args),
            stderr: output.stderr,
        });
    }

    if updates.iter().all(|u| u.status == RefStatus::UpToDate) {
        Ok(PushOutcome::UpToDate)
    } else {
        Ok(PushOutcome::Pushed)
    }
}
