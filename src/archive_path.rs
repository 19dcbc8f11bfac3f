//! Lexical handling of in-archive paths.
//!
//! Archive entry names always use `/` as separator, never start with `/`
//! and never contain `.` or empty segments. The helpers here normalize
//! destination strings without touching the file system.
//!
//! # Examples
//!
//! ```
//! use parzip::archive_path::{clean, join, parent};
//!
//! assert_eq!(clean("a//b/./c/"), "a/b/c");
//! assert_eq!(clean("a/b/../c"), "a/c");
//! assert_eq!(join("lib", "x/y.so"), "lib/x/y.so");
//! assert_eq!(parent("a/b/c"), Some("a/b"));
//! assert_eq!(parent("c"), None);
//! ```

use std::path::{Component, Path, PathBuf};

/// Normalizes a `/`-separated path lexically.
///
/// Repeated separators and `.` segments are removed, `..` cancels the
/// preceding segment, and leading or trailing separators are dropped. A path
/// that reduces to nothing yields an empty string.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Joins two archive paths and normalizes the result.
pub fn join(prefix: &str, path: &str) -> String {
    clean(&format!("{prefix}/{path}"))
}

/// Returns the parent of a clean archive path, or `None` at the top level.
pub fn parent(path: &str) -> Option<&str> {
    path.rfind('/').map(|i| &path[..i]).filter(|p| !p.is_empty())
}

/// Returns the last segment of a clean archive path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Converts a file-system path to an archive path string.
pub fn from_fs_path(path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    clean(&segments.join("/"))
}

/// Normalizes a file-system path lexically, keeping a leading root.
pub fn clean_fs_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal =
                    matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Makes `path` relative to `root`, lexically.
///
/// Returns `None` if `path` does not live under `root`. An empty `root`
/// accepts any relative path.
pub fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    let path = clean_fs_path(path);
    let root = clean_fs_path(root);
    if root.as_os_str().is_empty() {
        return (!path.has_root() && !path.starts_with("..")).then_some(path);
    }
    path.strip_prefix(&root)
        .ok()
        .filter(|rel| !rel.starts_with(".."))
        .map(Path::to_path_buf)
}
