//! Path helpers shared by the document types.

use std::path::{Component, Path, PathBuf};

/// Expand a leading `~` and anchor relative paths at `base`.
///
/// `.` and `..` components are folded lexically, so `/site/./docs` and
/// `/work/../site/docs` both become `/site/docs`.
pub(crate) fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
        None => path.to_path_buf(),
    };
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(out.components().next_back(), Some(Component::Normal(_))) => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Normalize a URL prefix: leading slash, no trailing slash (except `/`).
pub fn normalize_url_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}")
    }
}
