//! Path helpers for deterministic ordering

use std::path::{Component, Path, PathBuf};

/// Strip `base` from a matched path, leaving the base-relative part
///
/// Paths outside `base` are returned unchanged.
pub fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Sort key for a base-relative path
///
/// Normal components joined with `/` regardless of platform, so the same tree
/// orders identically everywhere.
pub fn relative_key(path: &Path) -> String {
    let mut key = String::new();
    for component in path.components() {
        if let Component::Normal(name) = component {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(&name.to_string_lossy());
        }
    }
    key
}
