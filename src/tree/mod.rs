//! Content fingerprinting for build-context file trees
//!
//! A tree digest is the SHA-256 of the ordered concatenation of every matched
//! file's own SHA-256, so identical content always yields the same digest.

pub mod hasher;
pub mod matcher;
pub mod path;

pub use hasher::{hash_tree, FileEntry, HashedFile, TreeHasher, TreeListing};
pub use matcher::PathMatcher;
