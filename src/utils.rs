//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Small shared helpers: path canonicalization and node-path rendering.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Canonicalizes a search directory, resolving symlinks and `..` components,
/// the way `Context::set_searchdir` must before comparing it against the
/// already-registered set.
pub(crate) fn canonicalize_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    std::fs::canonicalize(path)
        .map_err(|e| Error::sys_path(e.to_string(), path.display().to_string()))
}

/// Builds a schema-log-style path out of module name and a slash-separated
/// chain of local node names, e.g. `/ietf-interfaces:interfaces/interface`.
pub(crate) fn join_schema_path(module: &str, segments: &[&str]) -> String {
    let mut path = String::new();
    for (i, seg) in segments.iter().enumerate() {
        path.push('/');
        if i == 0 {
            path.push_str(module);
            path.push(':');
        }
        path.push_str(seg);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_schema_path_prefixes_only_first_segment() {
        assert_eq!(
            join_schema_path("ietf-interfaces", &["interfaces", "interface"]),
            "/ietf-interfaces:interfaces/interface"
        );
    }

    #[test]
    fn canonicalize_dir_resolves_dot_dot() {
        let tmp = std::env::temp_dir();
        let a = tmp.join("yang-ctx-test-a");
        let _ = std::fs::create_dir_all(&a);
        let roundabout = a.join("..").join("yang-ctx-test-a");

        let canon_a = canonicalize_dir(&a).unwrap();
        let canon_roundabout = canonicalize_dir(&roundabout).unwrap();
        assert_eq!(canon_a, canon_roundabout);

        let _ = std::fs::remove_dir(&a);
    }
}
