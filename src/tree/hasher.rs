//! Tree digest computation using SHA-256
//!
//! digest = H(H(file_1) || H(file_2) || ... || H(file_n))
//!
//! Files are ordered by their base-relative path string before folding, so the
//! digest does not depend on directory listing order.

use crate::error::TreeError;
use crate::tree::matcher::PathMatcher;
use crate::tree::path;
use crate::types::{Hash, TreeDigest};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Build-toolchain output that never contributes to a context's identity
pub const COMPILED_ARTIFACT_EXTENSIONS: &[&str] = &["pyc", "pyd", "pyo"];

/// A regular file selected for hashing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Base-relative path with `/` separators; the sort key
    pub relative: String,
    pub path: PathBuf,
}

/// A file and its individual content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    pub relative: String,
    pub content_hash: Hash,
}

/// Digest plus the ordered inputs that produced it
#[derive(Debug, Clone)]
pub struct TreeListing {
    pub digest: TreeDigest,
    pub files: Vec<HashedFile>,
}

pub fn is_compiled_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| COMPILED_ARTIFACT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Compute content hash for file bytes
pub fn compute_content_hash(content: &[u8]) -> Hash {
    to_hash(Sha256::digest(content).as_slice())
}

/// Stream a file through SHA-256
pub fn hash_file(path: &Path) -> Result<Hash, TreeError> {
    let unreadable = |source: io::Error| TreeError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(unreadable)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(unreadable)?;
    Ok(to_hash(hasher.finalize().as_slice()))
}

fn to_hash(bytes: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    out
}

/// Hashes the files matched by a set of patterns under one base directory
#[derive(Debug, Clone)]
pub struct TreeHasher {
    matcher: PathMatcher,
}

impl TreeHasher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            matcher: PathMatcher::new(base),
        }
    }

    pub fn base(&self) -> &Path {
        self.matcher.base()
    }

    /// Matched regular files, compiled artifacts removed, in digest order
    pub fn entries<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<FileEntry>, TreeError> {
        let matched = self.matcher.match_all(patterns)?;

        let mut entries = Vec::with_capacity(matched.len());
        for relative in matched {
            if is_compiled_artifact(&relative) {
                trace!(path = %relative.display(), "Skipping compiled artifact");
                continue;
            }

            let full_path = self.base().join(&relative);
            let metadata = fs::metadata(&full_path).map_err(|source| TreeError::Unreadable {
                path: full_path.clone(),
                source,
            })?;
            if !metadata.is_file() {
                continue;
            }

            entries.push(FileEntry {
                relative: path::relative_key(&relative),
                path: full_path,
            });
        }

        entries.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(entries)
    }

    /// Digest of the matched files together with each file's own hash
    pub fn listing<S: AsRef<str>>(&self, patterns: &[S]) -> Result<TreeListing, TreeError> {
        let entries = self.entries(patterns)?;

        let mut accumulator = Sha256::new();
        let mut files = Vec::with_capacity(entries.len());
        for entry in entries {
            let content_hash = hash_file(&entry.path)?;
            accumulator.update(content_hash);
            files.push(HashedFile {
                relative: entry.relative,
                content_hash,
            });
        }

        let digest = TreeDigest::from_bytes(to_hash(accumulator.finalize().as_slice()));
        debug!(
            base = %self.base().display(),
            files = files.len(),
            digest = %digest,
            "Hashed tree"
        );
        Ok(TreeListing { digest, files })
    }

    pub fn hash<S: AsRef<str>>(&self, patterns: &[S]) -> Result<TreeDigest, TreeError> {
        self.listing(patterns).map(|listing| listing.digest)
    }
}

/// Digest of every file under `base` matched by `patterns`
///
/// A pattern that matches nothing fails; patterns whose matches are all
/// filtered out produce the digest of zero inputs.
pub fn hash_tree<S: AsRef<str>>(base: &Path, patterns: &[S]) -> Result<TreeDigest, TreeError> {
    TreeHasher::new(base).hash(patterns)
}
