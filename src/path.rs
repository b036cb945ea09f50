//! Helpers for the full-path strings that identify inodes.
//!
//! Paths are opaque: nothing here canonicalizes `.`/`..` segments or repeated slashes.

use crate::disk_format::inode::ROOT_PATH;

/// The non-empty segments of `path`, in order. The root yields no segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// The path of entry `name` inside directory `parent`.
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Everything after the last slash.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// The directory containing `path`, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }

    match path.rfind('/') {
        Some(0) => Some(ROOT_PATH),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

/// Whether `candidate` names an immediate entry of directory `dir`.
pub fn is_child_of(dir: &str, candidate: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(dir) else {
        return false;
    };

    let rest = if dir.ends_with('/') {
        rest
    } else {
        let Some(rest) = rest.strip_prefix('/') else {
            return false;
        };
        rest
    };

    !rest.is_empty() && !rest.contains('/')
}
