//! # Notebook Conversion
//!
//! The pipeline treats conversion as an opaque capability: notebook in,
//! deterministic plain text out. `NotebookConverter` is that capability, and
//! `ScriptConverter` is the built-in implementation.
//!
//! ## Script layout
//!
//! `ScriptConverter` renders a notebook the way a "script" export does:
//!
//! ```text
//! #!/usr/bin/env python
//! # coding: utf-8
//!
//! # # A markdown heading
//! #
//! # Some prose.
//!
//! # In[3]:
//!
//!
//! print("hello")
//! ```
//!
//! Code cells keep their source verbatim under an `# In[N]:` marker (blank
//! when the cell never ran). Markdown and raw cells are emitted as `#`
//! comments. Outputs are never rendered, so re-executing a notebook without
//! changing its code leaves only the execution counters to differ.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Converts one notebook file into one artifact file.
pub trait NotebookConverter: Send + Sync {
    /// Read `notebook`, write its rendering to `destination`, creating parent
    /// directories as needed.
    fn convert(&self, notebook: &Path, destination: &Path) -> Result<()>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    fn text(&self) -> String {
        match self {
            Source::Text(text) => text.clone(),
            Source::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: Source,
    #[serde(default)]
    execution_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LanguageInfo {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotebookMetadata {
    language_info: Option<LanguageInfo>,
}

#[derive(Debug, Deserialize)]
struct Notebook {
    nbformat: u32,
    #[serde(default)]
    cells: Vec<Cell>,
    #[serde(default)]
    metadata: NotebookMetadata,
}

/// Built-in converter producing a commented script.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptConverter;

impl ScriptConverter {
    pub fn new() -> Self {
        Self
    }

    /// Render notebook JSON to script text. `origin` is only used in errors.
    pub fn render(&self, notebook_json: &str, origin: &Path) -> Result<String> {
        let conversion_error = |message: String| Error::Conversion {
            path: origin.to_path_buf(),
            message,
        };

        let notebook: Notebook = serde_json::from_str(notebook_json)
            .map_err(|e| conversion_error(format!("not a valid notebook: {}", e)))?;
        if notebook.nbformat < 4 {
            return Err(conversion_error(format!(
                "nbformat {} is not supported, expected 4 or later",
                notebook.nbformat
            )));
        }

        let language = notebook
            .metadata
            .language_info
            .as_ref()
            .and_then(|info| info.name.as_deref())
            .unwrap_or("python");

        let mut out = String::new();
        if language == "python" {
            out.push_str("#!/usr/bin/env python\n# coding: utf-8\n");
        }

        for cell in &notebook.cells {
            let source = cell.source.text();
            let source = source.trim_end_matches('\n');
            match cell.cell_type.as_str() {
                "code" => {
                    let count = cell
                        .execution_count
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| " ".to_string());
                    out.push_str(&format!("\n# In[{}]:\n\n\n", count));
                    if !source.is_empty() {
                        out.push_str(source);
                        out.push('\n');
                    }
                    out.push('\n');
                }
                "markdown" | "raw" => {
                    out.push('\n');
                    for line in source.lines() {
                        if line.is_empty() {
                            out.push_str("#\n");
                        } else {
                            out.push_str("# ");
                            out.push_str(line);
                            out.push('\n');
                        }
                    }
                }
                other => {
                    return Err(conversion_error(format!("unknown cell type '{}'", other)));
                }
            }
        }

        Ok(out)
    }
}

impl NotebookConverter for ScriptConverter {
    fn convert(&self, notebook: &Path, destination: &Path) -> Result<()> {
        let content = fs::read_to_string(notebook)?;
        let rendered = self.render(&content, notebook)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(destination, rendered)?;
        Ok(())
    }
}
