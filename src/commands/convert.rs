//! Convert command implementation
//!
//! Converts one notebook outside of any CI event. Without `-o` the artifact
//! lands at its mapped location under the configured output directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use nb_mirror::config;
use nb_mirror::converter::{NotebookConverter, ScriptConverter};
use nb_mirror::output::{self, OutputConfig};
use nb_mirror::phases::convert::convert_one;
use nb_mirror::repository::DefaultGitOperations;

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Notebook to convert
    #[arg(value_name = "NOTEBOOK")]
    pub notebook: PathBuf,

    /// Write the artifact here instead of its mapped location
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Repository root (defaults to GITHUB_WORKSPACE, then the current directory)
    #[arg(short = 'C', long = "repo", value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Path to config file, relative to the repository root
    #[arg(long, value_name = "PATH", env = "NB_MIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the convert command
pub fn execute(args: ConvertArgs, out: &OutputConfig) -> Result<()> {
    let converter = ScriptConverter::new();

    let artifact = match &args.output {
        Some(destination) => {
            converter
                .convert(&args.notebook, destination)
                .with_context(|| format!("Failed to convert {}", args.notebook.display()))?;
            destination.clone()
        }
        None => {
            let root = super::run::repository_root(args.repo.as_deref(), &DefaultGitOperations::default())?;
            let config = config::load(&root, args.config.as_deref())?;
            let notebook = args
                .notebook
                .canonicalize()
                .with_context(|| format!("Cannot read {}", args.notebook.display()))?;
            nb_mirror::path::validate_output_dir(&config.output_dir, &root)?;
            convert_one(&notebook, &root, &config, &converter)?.artifact
        }
    };

    if !args.quiet {
        println!(
            "{} {} -> {}",
            output::emoji(out, "✅", "[OK]"),
            args.notebook.display(),
            artifact.display()
        );
    }
    Ok(())
}
