//! Orchestrator for a complete run
//!
//! This module drives the pipeline for one CI event: resolve the event,
//! detect changed notebooks, convert them, and publish the artifacts when
//! the event allows it.

use std::path::Path;

use log::{info, warn};

use super::{phase1, phase2, phase3};
use crate::config::Config;
use crate::converter::NotebookConverter;
use crate::error::Result;
use crate::event::EventContext;
use crate::path;
use crate::repository::GitOperations;

/// Per-invocation switches that are not part of the repository config.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Convert, but never stage, commit or push.
    pub dry_run: bool,
    /// Publish to this branch instead of the one named by the event.
    pub branch_override: Option<String>,
}

/// Why publishing did or did not happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishDecision {
    Published(phase3::PublishOutcome),
    /// The event deleted its ref; nothing was detected or converted.
    SkippedBranchDeletion,
    /// No artifact was produced.
    SkippedNoChanges,
    /// Changes come from a fork; the token cannot push there.
    SkippedFork,
    SkippedDryRun,
    /// The event names no branch (for example a tag push).
    SkippedNoBranch,
}

/// Everything a run did, for reporting.
#[derive(Debug)]
pub struct PipelineSummary {
    pub detection: Option<phase1::DetectionReport>,
    pub conversion: phase2::ConversionReport,
    pub decision: PublishDecision,
}

/// Execute a complete run for `ctx` against the repository at `root`.
///
/// 1. Detect changed notebooks between the event's revisions
/// 2. Convert each one to its mirrored artifact
/// 3. Publish the artifacts, unless the event is from a fork, has no target
///    branch, or this is a dry run
///
/// Any error aborts the run before the next phase starts, so a failed
/// detection or conversion never leads to a commit.
pub fn execute(
    ctx: &EventContext,
    root: &Path,
    config: &Config,
    git: &dyn GitOperations,
    converter: &dyn NotebookConverter,
    options: &PipelineOptions,
) -> Result<PipelineSummary> {
    path::validate_output_dir(&config.output_dir, root)?;

    if ctx.revisions.is_branch_deletion() {
        info!("Event deletes its ref, nothing to do");
        return Ok(PipelineSummary {
            detection: None,
            conversion: phase2::ConversionReport::default(),
            decision: PublishDecision::SkippedBranchDeletion,
        });
    }

    info!(
        "Processing {} event {}..{}",
        ctx.name,
        ctx.revisions.before.short(),
        ctx.revisions.after.short()
    );

    // Phase 1: Change Detection
    let detection = phase1::ChangeDetector::new(&config.notebook_extension, config.fallback_depth)
        .detect(git, root, &ctx.revisions)?;

    // Phase 2: Conversion
    let conversion = phase2::execute(&detection.changes, root, config, converter)?;

    // Phase 3: Publishing
    let decision = decide_and_publish(ctx, root, config, git, options, &conversion)?;

    Ok(PipelineSummary {
        detection: Some(detection),
        conversion,
        decision,
    })
}

fn decide_and_publish(
    ctx: &EventContext,
    root: &Path,
    config: &Config,
    git: &dyn GitOperations,
    options: &PipelineOptions,
    conversion: &phase2::ConversionReport,
) -> Result<PublishDecision> {
    if conversion.converted.is_empty() {
        return Ok(PublishDecision::SkippedNoChanges);
    }
    if ctx.is_fork {
        warn!(
            "Changes come from fork {}, not publishing",
            ctx.head_repository.as_deref().unwrap_or("<unknown>")
        );
        return Ok(PublishDecision::SkippedFork);
    }
    if options.dry_run {
        info!("Dry run, not publishing {} artifact(s)", conversion.converted.len());
        return Ok(PublishDecision::SkippedDryRun);
    }

    let branch = match options.branch_override.as_ref().or(ctx.branch.as_ref()) {
        Some(branch) => branch,
        None => {
            warn!("Event names no branch to publish to, not publishing");
            return Ok(PublishDecision::SkippedNoBranch);
        }
    };

    let outcome =
        phase3::Publisher::from_config(git, config).publish(root, &conversion.artifacts(), branch)?;
    Ok(PublishDecision::Published(outcome))
}
