//! # Output Configuration
//!
//! This module controls how run results are printed: whether colors and
//! status markers are used, and how a [`PipelineSummary`] is rendered for a
//! human reading CI logs.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;
use std::fmt::Write as _;
use std::path::Path;

use console::style;

use crate::phases::orchestrator::{PipelineSummary, PublishDecision};
use crate::phases::publish::PublishOutcome;

/// Output configuration for controlling colors and markers.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never", or "auto".
    /// In auto mode, colors are disabled if `NO_COLOR` is set, `CLICOLOR=0`,
    /// `TERM=dumb`, or stdout is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain alternative otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

fn relative_display(path: &Path, root: &Path) -> String {
    crate::path::to_slash(path.strip_prefix(root).unwrap_or(path))
}

/// One-line description of a publish decision.
pub fn describe_decision(decision: &PublishDecision) -> String {
    match decision {
        PublishDecision::Published(PublishOutcome::Pushed { commit }) => {
            format!("pushed {}", &commit[..commit.len().min(7)])
        }
        PublishDecision::Published(PublishOutcome::AlreadyUpToDate { commit }) => {
            format!("committed {}, remote already up to date", &commit[..commit.len().min(7)])
        }
        PublishDecision::Published(PublishOutcome::NothingToCommit) => {
            "artifacts already up to date, nothing to commit".to_string()
        }
        PublishDecision::SkippedBranchDeletion => "branch deleted, nothing to do".to_string(),
        PublishDecision::SkippedNoChanges => "no notebooks changed".to_string(),
        PublishDecision::SkippedFork => "changes come from a fork, not published".to_string(),
        PublishDecision::SkippedDryRun => "dry run, not published".to_string(),
        PublishDecision::SkippedNoBranch => "no target branch, not published".to_string(),
    }
}

/// Render a run summary as text, with paths relative to `root`.
pub fn render_summary(config: &OutputConfig, summary: &PipelineSummary, root: &Path) -> String {
    let mut out = String::new();

    if let Some(detection) = &summary.detection {
        let _ = writeln!(
            out,
            "{} {} changed notebook(s) ({})",
            emoji(config, "🔍", "[SCAN]"),
            detection.changes.len(),
            detection.strategy
        );
    }

    for converted in &summary.conversion.converted {
        let line = format!(
            "{} -> {}",
            relative_display(&converted.notebook, root),
            relative_display(&converted.artifact, root)
        );
        let line = if config.use_color {
            style(line).green().to_string()
        } else {
            line
        };
        let _ = writeln!(out, "   {}", line);
    }

    for (notebook, error) in &summary.conversion.failed {
        let line = format!("{}: {}", relative_display(notebook, root), error);
        let line = if config.use_color {
            style(line).yellow().to_string()
        } else {
            line
        };
        let _ = writeln!(out, "{} {}", emoji(config, "⚠️", "[SKIP]"), line);
    }

    let _ = writeln!(
        out,
        "{} {}",
        emoji(config, "✅", "[DONE]"),
        describe_decision(&summary.decision)
    );
    out
}
