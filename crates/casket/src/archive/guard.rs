//! Zip-slip protection.
//!
//! Entry names are resolved against the destination purely lexically: no
//! filesystem calls, no symlink resolution. The resolved path must be a
//! strict descendant of the destination or the whole unpack is rejected.

use std::path::{Component, Path, PathBuf};

use crate::error::{CasketError, Result};

/// Resolve an archive entry name under `destination`.
///
/// Backslashes count as separators, so `..\..\evil` is caught the same way
/// as `../../evil`. Absolute names resolve outside the destination and are
/// rejected.
pub fn resolve_entry(destination: &Path, name: &str) -> Result<PathBuf> {
    let root = normalize(destination);
    let candidate = normalize(&root.join(name.replace('\\', "/")));

    if candidate != root && candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        tracing::warn!(entry = name, destination = %destination.display(), "Rejected archive entry");
        Err(CasketError::PathTraversal {
            entry: name.to_string(),
            destination: destination.to_path_buf(),
        })
    }
}

/// Fold `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root; leading `..` in a relative path is
/// kept so that it still fails a prefix check.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
