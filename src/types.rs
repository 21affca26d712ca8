//! Core value types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw SHA-256 output
pub type Hash = [u8; 32];

/// Digest summarising the content of a matched file set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeDigest(Hash);

impl TreeDigest {
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Lowercase hex, 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TreeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A build context directory and its content-derived tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageContext {
    #[serde(rename = "image_name")]
    pub name: String,
    #[serde(rename = "image_tag")]
    pub tag: String,
    #[serde(skip)]
    pub digest: TreeDigest,
}

impl ImageContext {
    /// Tag format: `{name}-{digest}`
    pub fn new(name: impl Into<String>, digest: TreeDigest) -> Self {
        let name = name.into();
        let tag = format!("{}-{}", name, digest);
        Self { name, tag, digest }
    }
}

/// Bare digest for one build context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFingerprint {
    pub name: String,
    pub sha256: String,
}

impl From<&ImageContext> for ImageFingerprint {
    fn from(image: &ImageContext) -> Self {
        Self {
            name: image.name.clone(),
            sha256: image.digest.to_hex(),
        }
    }
}

/// A deployable that runs one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub app_name: String,
    pub image_name: String,
}

/// An application resolved to its current image tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationTag {
    pub app_name: String,
    pub image_tag: String,
}
