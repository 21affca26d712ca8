//! Registry Oracle
//!
//! Answers whether a tag is already published in a container registry. The
//! planner only sees the [`RegistryOracle`] trait; token exchange and HTTP
//! details live in [`http::HttpRegistryClient`].

use crate::error::RegistryError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

pub mod http;

pub use http::{HttpRegistryClient, RegistryConfig};

/// Outcome of a manifest lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLookup {
    /// Tag is published; carries the registry's content digest
    Found { digest: String },
    NotFound,
}

impl ManifestLookup {
    pub fn digest(&self) -> Option<&str> {
        match self {
            ManifestLookup::Found { digest } => Some(digest),
            ManifestLookup::NotFound => None,
        }
    }
}

/// Registry query capability
#[async_trait]
pub trait RegistryOracle: Send + Sync {
    /// Look up the manifest for `repository:tag`
    async fn lookup(&self, repository: &str, tag: &str) -> Result<ManifestLookup, RegistryError>;

    /// Registry name, for logging
    fn registry_name(&self) -> &str;

    async fn exists(&self, repository: &str, tag: &str) -> Result<bool, RegistryError> {
        Ok(matches!(
            self.lookup(repository, tag).await?,
            ManifestLookup::Found { .. }
        ))
    }

    async fn current_digest(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Option<String>, RegistryError> {
        Ok(self.lookup(repository, tag).await?.digest().map(str::to_string))
    }
}

/// In-memory registry with a fixed set of published tags
///
/// Every lookup is recorded so callers can assert on query traffic.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    published: HashMap<(String, String), String>,
    failing: HashMap<(String, String), String>,
    queries: Mutex<Vec<(String, String)>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `repository:tag` with the given content digest
    pub fn with_tag(mut self, repository: &str, tag: &str, digest: &str) -> Self {
        self.published
            .insert((repository.to_string(), tag.to_string()), digest.to_string());
        self
    }

    /// Make lookups of `repository:tag` fail with a transport error
    pub fn with_failure(mut self, repository: &str, tag: &str, message: &str) -> Self {
        self.failing
            .insert((repository.to_string(), tag.to_string()), message.to_string());
        self
    }

    /// Lookups performed so far, in call order
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl RegistryOracle for StaticRegistry {
    async fn lookup(&self, repository: &str, tag: &str) -> Result<ManifestLookup, RegistryError> {
        let key = (repository.to_string(), tag.to_string());
        self.queries.lock().push(key.clone());

        if let Some(message) = self.failing.get(&key) {
            return Err(RegistryError::Transport {
                repository: repository.to_string(),
                tag: tag.to_string(),
                message: message.clone(),
            });
        }

        Ok(match self.published.get(&key) {
            Some(digest) => ManifestLookup::Found {
                digest: digest.clone(),
            },
            None => ManifestLookup::NotFound,
        })
    }

    fn registry_name(&self) -> &str {
        "static"
    }
}
