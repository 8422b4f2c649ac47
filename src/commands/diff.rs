//! Diff command implementation
//!
//! Prints the notebooks the change detector finds between two revisions,
//! one repository-relative path per line. Paths are printed exactly as git
//! stores them, without quoting or escaping.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;

use nb_mirror::config;
use nb_mirror::event::{Revision, RevisionPair};
use nb_mirror::phases::detect::ChangeDetector;
use nb_mirror::repository::DefaultGitOperations;

/// Arguments for the diff command
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Base revision (40 hex characters; all zeros for a first push)
    #[arg(long, value_name = "SHA")]
    pub before: String,

    /// Head revision (40 hex characters)
    #[arg(long, value_name = "SHA")]
    pub after: String,

    /// Repository root (defaults to GITHUB_WORKSPACE, then the current directory)
    #[arg(short = 'C', long = "repo", value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Path to config file, relative to the repository root
    #[arg(long, value_name = "PATH", env = "NB_MIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Separate paths with NUL instead of newline
    #[arg(short = 'z')]
    pub null: bool,
}

fn parse_revision(name: &str, value: &str) -> Result<Revision> {
    Revision::parse(value)
        .ok_or_else(|| anyhow!("--{} must be a 40-character hexadecimal revision, got '{}'", name, value))
}

/// Execute the diff command
pub fn execute(args: DiffArgs) -> Result<()> {
    let revisions = RevisionPair::new(
        parse_revision("before", &args.before)?,
        parse_revision("after", &args.after)?,
    );
    let root = super::run::repository_root(args.repo.as_deref(), &DefaultGitOperations::default())?;
    let config = config::load(&root, args.config.as_deref())?;
    let git = DefaultGitOperations::new(config.git_timeout());

    let report = ChangeDetector::new(&config.notebook_extension, config.fallback_depth)
        .detect(&git, &root, &revisions)?;

    let terminator: &[u8] = if args.null { b"\0" } else { b"\n" };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for path in report.changes.iter() {
        let relative = path.strip_prefix(&root).unwrap_or(path.as_path());
        write_path(&mut handle, relative)?;
        handle.write_all(terminator)?;
    }
    handle.flush()?;
    Ok(())
}

#[cfg(unix)]
fn write_path(out: &mut impl Write, path: &std::path::Path) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    out.write_all(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn write_path(out: &mut impl Write, path: &std::path::Path) -> io::Result<()> {
    out.write_all(nb_mirror::path::to_slash(path).as_bytes())
}
