//! Phase 2: Conversion
//!
//! Maps every notebook of a [`ChangeSet`] to its artifact path and runs the
//! converter on it. Notebooks convert in parallel; all results are gathered
//! before anything is returned, so the publisher never sees a partial batch
//! under the fail-fast policy.
//!
//! Path traversal is always fatal, whatever the conversion policy: a notebook
//! (or symlink) that resolves outside the repository root aborts the run.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use super::ChangeSet;
use crate::config::{Config, ConversionPolicy};
use crate::converter::NotebookConverter;
use crate::error::{Error, Result};
use crate::path;

/// A notebook and the artifact written for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedArtifact {
    pub notebook: PathBuf,
    pub artifact: PathBuf,
}

/// Result of converting a change set.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Successful conversions, in change-set order.
    pub converted: Vec<ConvertedArtifact>,
    /// Notebooks skipped because of an exclude rule.
    pub excluded: Vec<PathBuf>,
    /// Failures tolerated under [`ConversionPolicy::Skip`].
    pub failed: Vec<(PathBuf, Error)>,
}

impl ConversionReport {
    /// Absolute artifact paths, ready for staging.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.converted.iter().map(|c| c.artifact.clone()).collect()
    }
}

/// Convert one notebook to its mapped artifact path.
pub fn convert_one(
    notebook: &Path,
    root: &Path,
    config: &Config,
    converter: &dyn NotebookConverter,
) -> Result<ConvertedArtifact> {
    let relative = path::relative_to_root(notebook, root)?;
    let on_disk = match path::resolve_on_disk(&relative, root) {
        Ok(resolved) => resolved,
        Err(Error::Io(e)) => {
            return Err(Error::Conversion {
                path: notebook.to_path_buf(),
                message: format!("cannot read notebook: {}", e),
            })
        }
        Err(e) => return Err(e),
    };
    let artifact = path::map_to_artifact(
        &relative,
        root,
        &config.output_dir,
        &config.artifact_extension,
    )?;

    debug!("Converting {} -> {}", relative.display(), artifact.display());
    converter.convert(&on_disk, &artifact).map_err(|e| match e {
        Error::Conversion { .. } => e,
        other => Error::Conversion {
            path: notebook.to_path_buf(),
            message: other.to_string(),
        },
    })?;

    Ok(ConvertedArtifact {
        notebook: notebook.to_path_buf(),
        artifact,
    })
}

/// Convert every notebook in `changes`.
///
/// Excluded notebooks are reported and left alone. With the fail policy the
/// first failure (in change-set order) is returned; with the skip policy
/// failures are logged and collected in the report.
pub fn execute(
    changes: &ChangeSet,
    root: &Path,
    config: &Config,
    converter: &dyn NotebookConverter,
) -> Result<ConversionReport> {
    let mut report = ConversionReport::default();
    let mut pending = Vec::new();

    for notebook in changes.iter() {
        let relative = path::relative_to_root(notebook, root)?;
        if config.is_excluded(&relative)? {
            debug!("Skipping excluded notebook {}", relative.display());
            report.excluded.push(notebook.clone());
        } else {
            pending.push(notebook);
        }
    }

    let mut results: Vec<(PathBuf, Result<ConvertedArtifact>)> = pending
        .par_iter()
        .map(|notebook| {
            (
                (*notebook).clone(),
                convert_one(notebook, root, config, converter),
            )
        })
        .collect();

    // Traversal aborts regardless of policy.
    if let Some(index) = results
        .iter()
        .position(|(_, r)| matches!(r, Err(Error::PathTraversal { .. })))
    {
        if let (_, Err(e)) = results.swap_remove(index) {
            return Err(e);
        }
    }

    for (notebook, result) in results {
        match result {
            Ok(converted) => report.converted.push(converted),
            Err(e) => match config.on_conversion_error {
                ConversionPolicy::FailFast => return Err(e),
                ConversionPolicy::Skip => {
                    warn!("Skipping {}: {}", notebook.display(), e);
                    report.failed.push((notebook, e));
                }
            },
        }
    }

    info!(
        "Converted {} notebook(s), {} excluded, {} failed",
        report.converted.len(),
        report.excluded.len(),
        report.failed.len()
    );
    Ok(report)
}
