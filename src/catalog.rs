//! Image catalog: one build context per subdirectory of the docker root.

use crate::error::TreeError;
use crate::tree::TreeHasher;
use crate::types::{ImageContext, ImageFingerprint};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Longest tag a Docker registry accepts
const MAX_TAG_LEN: usize = 128;

/// Enumerates build contexts and derives their content tags
#[derive(Debug, Clone)]
pub struct ImageCatalog {
    root: PathBuf,
}

impl ImageCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the immediate subdirectories of the root, sorted
    pub fn context_names(&self) -> Result<Vec<String>, TreeError> {
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        let mut names = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                TreeError::Unreadable { path, source }
            })?;

            // Follows symlinked contexts; plain files at the top level are not contexts
            if !entry.path().is_dir() {
                debug!(path = %entry.path().display(), "Skipping non-directory entry");
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Compute the content tag of a single context
    pub fn image(&self, name: &str) -> Result<ImageContext, TreeError> {
        let pattern = format!("{}/**/*", Pattern::escape(name));
        let digest = TreeHasher::new(&self.root).hash(&[pattern])?;
        let image = ImageContext::new(name, digest);

        if image.tag.len() > MAX_TAG_LEN {
            warn!(
                image = %image.name,
                length = image.tag.len(),
                "Image tag exceeds the {} character registry limit",
                MAX_TAG_LEN
            );
        }
        debug!(image = %image.name, tag = %image.tag, "Computed image tag");
        Ok(image)
    }

    /// Every build context with its content-derived tag
    pub fn enumerate(&self) -> Result<Vec<ImageContext>, TreeError> {
        let names = self.context_names()?;
        let images = names
            .iter()
            .map(|name| self.image(name))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            root = %self.root.display(),
            images = images.len(),
            "Enumerated build contexts"
        );
        Ok(images)
    }

    /// Bare digests per context
    pub fn fingerprints(&self) -> Result<Vec<ImageFingerprint>, TreeError> {
        Ok(self
            .enumerate()?
            .iter()
            .map(ImageFingerprint::from)
            .collect())
    }
}
