//! Run command implementation
//!
//! The run command executes the full pipeline for one CI event:
//! 1. Resolve the event payload into a revision pair
//! 2. Detect changed notebooks
//! 3. Convert them to their mirrored artifacts
//! 4. Commit and push the artifacts when the event allows it

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use nb_mirror::config::{self, Config};
use nb_mirror::converter::ScriptConverter;
use nb_mirror::event::EventContext;
use nb_mirror::output::{self, OutputConfig};
use nb_mirror::phases::orchestrator::{self, PipelineOptions};
use nb_mirror::repository::DefaultGitOperations;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the CI event payload (JSON)
    #[arg(long, value_name = "PATH", env = "GITHUB_EVENT_PATH")]
    pub event_path: PathBuf,

    /// Name of the CI event (push, pull_request)
    #[arg(long, value_name = "NAME", env = "GITHUB_EVENT_NAME")]
    pub event_name: String,

    /// Repository root (defaults to GITHUB_WORKSPACE, then the current directory)
    #[arg(short = 'C', long = "repo", value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Path to config file, relative to the repository root
    #[arg(long, value_name = "PATH", env = "NB_MIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for generated artifacts, relative to the repository root
    #[arg(long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Branch to publish to instead of the one named by the event
    #[arg(long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Remote to push to
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,

    /// Convert notebooks but never stage, commit or push
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Resolve the repository root: the top level of the work tree containing
/// the given (or default) directory.
pub(crate) fn repository_root(repo: Option<&Path>, git: &DefaultGitOperations) -> Result<PathBuf> {
    let start = repo
        .map(Path::to_path_buf)
        .unwrap_or_else(nb_mirror::defaults::default_repository_root);
    let top = git
        .toplevel(&start)
        .with_context(|| format!("{} is not inside a git work tree", start.display()))?;
    Ok(top.canonicalize().unwrap_or(top))
}

fn load_config(root: &Path, args: &RunArgs) -> Result<Config> {
    let mut config = config::load(root, args.config.as_deref())?;
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(remote) = &args.remote {
        config.remote = remote.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Execute the run command
pub fn execute(args: RunArgs, out: &OutputConfig) -> Result<()> {
    let root = repository_root(args.repo.as_deref(), &DefaultGitOperations::default())?;
    let config = load_config(&root, &args)?;
    let git = DefaultGitOperations::new(config.git_timeout());

    let ctx = EventContext::from_file(&args.event_name, &args.event_path).with_context(|| {
        format!("Failed to read event payload {}", args.event_path.display())
    })?;

    let options = PipelineOptions {
        dry_run: args.dry_run,
        branch_override: args.branch.clone(),
    };

    if !args.quiet && args.dry_run {
        println!("{} DRY RUN MODE - Nothing will be committed", output::emoji(out, "🔎", "[DRY]"));
    }

    let summary = orchestrator::execute(&ctx, &root, &config, &git, &ScriptConverter::new(), &options)?;

    if !args.quiet {
        print!("{}", output::render_summary(out, &summary, &root));
    }
    Ok(())
}
