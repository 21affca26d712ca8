//! Error types for the imprint build-decision engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while matching and hashing build-context files
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Pattern did not match anything: {pattern}")]
    NoMatch { pattern: String },

    #[error("Invalid glob pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Registry query errors
///
/// A missing tag is not an error; it is reported as
/// [`ManifestLookup::NotFound`](crate::registry::ManifestLookup::NotFound).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry authentication failed for {repository}: {message}")]
    AuthFailed { repository: String, message: String },

    #[error("Registry request failed for {repository}:{tag}: {message}")]
    Transport {
        repository: String,
        tag: String,
        message: String,
    },

    #[error("Registry returned no content digest for {repository}:{tag}")]
    MissingDigest { repository: String, tag: String },

    #[error("Registry client error: {0}")]
    Client(String),
}

/// Errors surfaced by a decision run
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(
        "Application {app_name} must match exactly one image named {image_name}, found {}: [{}]",
        matches.len(),
        matches.join(", ")
    )]
    AmbiguousApplicationMapping {
        app_name: String,
        image_name: String,
        matches: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write {path}: {message}")]
    Output { path: PathBuf, message: String },
}

impl From<config::ConfigError> for PlanError {
    fn from(err: config::ConfigError) -> Self {
        PlanError::Config(err.to_string())
    }
}
