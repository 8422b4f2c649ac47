//! Path mapping between notebooks and their mirrored artifacts.
//!
//! Every path that leaves this module is guaranteed to lie strictly inside
//! the repository root. The mapping functions are lexical (no I/O); the one
//! exception is [`resolve_on_disk`], which follows symlinks so the pipeline
//! can reject links that point outside the checkout.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Lexically normalize a path: drop `.` segments and fold `..` into their
/// parent. A `..` directly under the filesystem root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                match last {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => out.push(".."),
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Resolve `path` against `root` and return it relative to the root.
///
/// Fails with [`Error::PathTraversal`] if the normalized path is the root
/// itself or lies outside it.
pub fn relative_to_root(path: &Path, root: &Path) -> Result<PathBuf> {
    let root = normalize(root);
    let absolute = normalize(&root.join(path));

    match absolute.strip_prefix(&root) {
        Ok(relative) if !relative.as_os_str().is_empty() => Ok(relative.to_path_buf()),
        _ => Err(Error::PathTraversal {
            path: path.to_path_buf(),
            root,
        }),
    }
}

/// Check that a configured output directory is relative and stays inside the
/// repository root.
pub fn validate_output_dir(output_dir: &Path, root: &Path) -> Result<()> {
    if output_dir.is_absolute() {
        return Err(Error::PathTraversal {
            path: output_dir.to_path_buf(),
            root: normalize(root),
        });
    }
    relative_to_root(output_dir, root).map(|_| ())
}

/// Map a notebook path to its artifact path.
///
/// The notebook's path relative to `root` is re-rooted under `output_dir`
/// (itself relative to `root`) and its extension replaced by
/// `artifact_extension`. The result is absolute whenever `root` is.
pub fn map_to_artifact(
    notebook: &Path,
    root: &Path,
    output_dir: &Path,
    artifact_extension: &str,
) -> Result<PathBuf> {
    validate_output_dir(output_dir, root)?;
    let relative = relative_to_root(notebook, root)?;

    Ok(normalize(root)
        .join(normalize(output_dir))
        .join(relative)
        .with_extension(artifact_extension))
}

/// Canonicalize `path` on disk and verify it still lives under the
/// canonical repository root, catching symlinks that escape the checkout.
pub fn resolve_on_disk(path: &Path, root: &Path) -> Result<PathBuf> {
    let canonical_root = root.canonicalize()?;
    let canonical = root.join(path).canonicalize()?;

    if canonical.starts_with(&canonical_root) && canonical != canonical_root {
        Ok(canonical)
    } else {
        Err(Error::PathTraversal {
            path: path.to_path_buf(),
            root: canonical_root,
        })
    }
}

/// Render a repository-relative path with forward slashes, the form git and
/// the exclude globs use.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
