//! Glob expansion rooted at a base directory

use crate::error::TreeError;
use crate::tree::path;
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// `*` stays within one path segment; hidden files are matched like any other.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Expands glob patterns against a fixed base directory
#[derive(Debug, Clone)]
pub struct PathMatcher {
    base: PathBuf,
}

impl PathMatcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Expand one pattern into base-relative paths
    ///
    /// Both files and directories are returned. Symlinks are matched as
    /// entries but never descended into. A pattern that matches nothing is an
    /// error rather than an empty set.
    pub fn matches(&self, pattern: &str) -> Result<BTreeSet<PathBuf>, TreeError> {
        let normalized = normalize_pattern(pattern)?;
        let compiled = Pattern::new(&normalized).map_err(|e| TreeError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let (prefix, depth) = walk_scope(&normalized);
        let start = self.base.join(prefix);
        match fs::symlink_metadata(&start) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(no_match(pattern)),
            Err(source) => return Err(TreeError::Unreadable { path: start, source }),
        }

        let mut walker = WalkDir::new(&start).follow_links(false);
        if let Some(depth) = depth {
            walker = walker.max_depth(depth);
        }

        let mut found = BTreeSet::new();
        for entry in walker {
            let entry = entry.map_err(|e| walk_error(&start, e))?;
            let relative = path::relative_to(&self.base, entry.path());
            if compiled.matches_with(&path::relative_key(&relative), MATCH_OPTIONS) {
                trace!(path = %relative.display(), "Pattern match");
                found.insert(relative);
            }
        }

        if found.is_empty() {
            return Err(no_match(pattern));
        }

        debug!(pattern, matches = found.len(), "Expanded pattern");
        Ok(found)
    }

    /// Union of every pattern's matches; each pattern must match something
    pub fn match_all<S: AsRef<str>>(&self, patterns: &[S]) -> Result<BTreeSet<PathBuf>, TreeError> {
        let mut files = BTreeSet::new();
        for pattern in patterns {
            files.extend(self.matches(pattern.as_ref())?);
        }
        Ok(files)
    }
}

fn no_match(pattern: &str) -> TreeError {
    TreeError::NoMatch {
        pattern: pattern.to_string(),
    }
}

fn invalid(pattern: &str, message: &str) -> TreeError {
    TreeError::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.to_string(),
    }
}

/// Drop empty and `.` segments; reject patterns that could leave the base
fn normalize_pattern(pattern: &str) -> Result<String, TreeError> {
    if Path::new(pattern).is_absolute() {
        return Err(invalid(pattern, "pattern must be relative to the base directory"));
    }

    let mut segments = Vec::new();
    for segment in pattern.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid(pattern, "pattern must not leave the base directory")),
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(invalid(pattern, "pattern is empty"));
    }
    Ok(segments.join("/"))
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?', '['])
}

/// Literal leading directory to walk from, and how deep below it matches can lie
///
/// `None` depth means the pattern contains `**` and the walk is unbounded.
fn walk_scope(normalized: &str) -> (PathBuf, Option<usize>) {
    let segments: Vec<&str> = normalized.split('/').collect();
    let literal = segments
        .iter()
        .take_while(|segment| !has_wildcard(segment))
        .count();

    let prefix: PathBuf = segments[..literal].iter().collect();
    let rest = &segments[literal..];
    let depth = if rest.contains(&"**") {
        None
    } else {
        Some(rest.len())
    };
    (prefix, depth)
}

fn walk_error(start: &Path, error: walkdir::Error) -> TreeError {
    let path = error
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| start.to_path_buf());
    let source = error
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    TreeError::Unreadable { path, source }
}
