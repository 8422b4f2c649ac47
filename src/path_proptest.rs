//! Property-based tests for notebook path mapping.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::error::Error;
    use crate::path::{map_to_artifact, normalize, relative_to_root};
    use proptest::prelude::*;
    use std::path::{Path, PathBuf};

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_ é<>-]{1,12}".prop_filter("not a dot segment", |s| s != "." && s != "..")
    }

    fn nested(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(segment(), 1..max)
    }

    // ============================================================================
    // map_to_artifact property tests
    // ============================================================================

    proptest! {
        /// Property: notebooks strictly inside the root map strictly inside root/outDir
        #[test]
        fn inside_root_maps_inside_output_dir(parts in nested(5)) {
            let root = Path::new("/repo");
            let notebook = root.join(parts.join("/")).with_extension("ipynb");
            let artifact = map_to_artifact(&notebook, root, Path::new("out/nb"), "py").unwrap();

            let output_root = PathBuf::from("/repo/out/nb");
            prop_assert!(artifact.starts_with(&output_root));
            prop_assert_ne!(&artifact, &output_root);
            prop_assert_eq!(artifact.extension().and_then(|e| e.to_str()), Some("py"));
        }

        /// Property: escaping the root with enough `..` segments is always rejected
        #[test]
        fn parent_escape_is_rejected(parts in nested(4), extra in 1usize..3) {
            let depth = parts.len() + extra;
            let ups = vec![".."; depth].join("/");
            let notebook = PathBuf::from(format!("/repo/{}/{}/evil.ipynb", parts.join("/"), ups));

            let result = map_to_artifact(&notebook, Path::new("/repo"), Path::new("out"), "py");
            let is_traversal = matches!(result, Err(Error::PathTraversal { .. }));
            prop_assert!(is_traversal);
        }

        /// Property: mapping is deterministic and one-to-one
        #[test]
        fn mapping_is_injective(a in nested(4), b in nested(4)) {
            let root = Path::new("/repo");
            let na = root.join(a.join("/")).with_extension("ipynb");
            let nb = root.join(b.join("/")).with_extension("ipynb");
            let ma = map_to_artifact(&na, root, Path::new("out"), "py").unwrap();
            let mb = map_to_artifact(&nb, root, Path::new("out"), "py").unwrap();

            prop_assert_eq!(&ma, &map_to_artifact(&na, root, Path::new("out"), "py").unwrap());
            prop_assert_eq!(na == nb, ma == mb);
        }

        /// Property: normalize is idempotent
        #[test]
        fn normalize_is_idempotent(input in "(/)?([a-z]{1,3}|\\.|\\.\\.)(/([a-z]{1,3}|\\.|\\.\\.)){0,6}") {
            let once = normalize(Path::new(&input));
            prop_assert_eq!(normalize(&once), once);
        }

        /// Property: relative_to_root never returns a path with `..` segments
        #[test]
        fn relative_paths_never_climb(parts in nested(5)) {
            let relative = relative_to_root(Path::new(&parts.join("/")), Path::new("/repo")).unwrap();
            prop_assert!(!relative.components().any(|c| c.as_os_str() == ".."));
        }
    }
}
