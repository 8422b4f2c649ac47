//! # Configuration
//!
//! This module defines the optional `.nb-mirror.yaml` file that tunes the
//! pipeline, and the logic for loading and validating it. Every field has a
//! default (see [`crate::defaults`]), so a repository without the file gets
//! the stock behavior.
//!
//! ## Example
//!
//! ```yaml
//! output_dir: docs/scripts
//! artifact_extension: py
//! exclude:
//!   - "scratch/**"
//! on_conversion_error: fail
//! author:
//!   name: notebook-bot
//!   email: bot@example.com
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Identity used for automation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: defaults::AUTHOR_NAME.to_string(),
            email: defaults::AUTHOR_EMAIL.to_string(),
        }
    }
}

/// What to do when a single notebook fails to convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionPolicy {
    /// Abort the run; nothing is staged, committed or pushed.
    #[default]
    #[serde(rename = "fail")]
    FailFast,
    /// Log the failure, leave that artifact untouched and publish the rest.
    #[serde(rename = "skip")]
    Skip,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory, relative to the repository root, that mirrors the notebooks.
    pub output_dir: PathBuf,
    /// Extension (without dot) identifying notebook files.
    pub notebook_extension: String,
    /// Extension (without dot) given to generated artifacts.
    pub artifact_extension: String,
    /// Remote the publisher pushes to.
    pub remote: String,
    pub author: Author,
    pub commit_message: String,
    /// Glob patterns over repository-relative notebook paths to ignore.
    pub exclude: Vec<String>,
    pub git_timeout_secs: u64,
    /// Cap on the commits walked when the `before` revision is missing
    /// locally. Unset walks the whole available first-parent history.
    pub fallback_depth: Option<usize>,
    pub on_conversion_error: ConversionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
            notebook_extension: defaults::NOTEBOOK_EXTENSION.to_string(),
            artifact_extension: defaults::ARTIFACT_EXTENSION.to_string(),
            remote: defaults::REMOTE.to_string(),
            author: Author::default(),
            commit_message: defaults::COMMIT_MESSAGE.to_string(),
            exclude: Vec::new(),
            git_timeout_secs: defaults::GIT_TIMEOUT_SECS,
            fallback_depth: None,
            on_conversion_error: ConversionPolicy::default(),
        }
    }
}

fn check_extension(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('.') || value.contains('/') {
        return Err(Error::ConfigParse {
            message: format!("{} must be a bare extension, got '{}'", field, value),
            hint: Some(format!("write it without a dot, e.g. '{}: py'", field)),
        });
    }
    Ok(())
}

impl Config {
    /// Validate field values that do not depend on the repository root.
    pub fn validate(&self) -> Result<()> {
        check_extension("notebook_extension", &self.notebook_extension)?;
        check_extension("artifact_extension", &self.artifact_extension)?;

        if self.notebook_extension == self.artifact_extension {
            return Err(Error::ConfigParse {
                message: "notebook_extension and artifact_extension must differ".to_string(),
                hint: None,
            });
        }
        if self.output_dir.is_absolute() {
            return Err(Error::ConfigParse {
                message: format!(
                    "output_dir must be relative to the repository root, got '{}'",
                    self.output_dir.display()
                ),
                hint: None,
            });
        }
        if self.git_timeout_secs == 0 {
            return Err(Error::ConfigParse {
                message: "git_timeout_secs must be greater than zero".to_string(),
                hint: None,
            });
        }
        if self.fallback_depth == Some(0) {
            return Err(Error::ConfigParse {
                message: "fallback_depth must be greater than zero".to_string(),
                hint: Some("remove the field to walk the whole available history".to_string()),
            });
        }
        self.exclude_patterns()?;
        Ok(())
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    /// Compile the exclude globs.
    pub fn exclude_patterns(&self) -> Result<Vec<Pattern>> {
        self.exclude
            .iter()
            .map(|p| Pattern::new(p).map_err(Error::Glob))
            .collect()
    }

    /// Whether a repository-relative notebook path matches an exclude glob
    /// or lies inside the output directory.
    pub fn is_excluded(&self, relative: &Path) -> Result<bool> {
        if relative.starts_with(crate::path::normalize(&self.output_dir)) {
            return Ok(true);
        }
        let slash = crate::path::to_slash(relative);
        Ok(self
            .exclude_patterns()?
            .iter()
            .any(|pattern| pattern.matches(&slash)))
    }
}

/// Parse a YAML string into a validated [`Config`].
///
/// An empty document yields the defaults.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let config = if yaml_content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str::<Config>(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: Some("see the field list in the README".to_string()),
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Parse a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Load the configuration for a repository.
///
/// An explicitly given path must exist. Without one, `.nb-mirror.yaml` at the
/// repository root is used if present, and the defaults otherwise.
pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => from_file(root.join(path)),
        None => {
            let default_path = root.join(defaults::CONFIG_FILE_NAME);
            if default_path.is_file() {
                log::debug!("Loading configuration from {}", default_path.display());
                from_file(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}
