//! Configuration System
//!
//! Layered run configuration: built-in defaults, the user's global file, the
//! workspace `imprint.toml` (plus an optional per-environment file) and
//! `IMPRINT_*` environment variables, in increasing precedence.

use crate::logging::LoggingConfig;
use crate::registry::RegistryConfig;
use crate::types::Application;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprintConfig {
    /// Directory holding one build context per subdirectory
    #[serde(default = "default_docker_dir")]
    pub docker_dir: PathBuf,

    /// Registry repository the images are published to (e.g. `org/images`)
    #[serde(default)]
    pub repository: String,

    /// Resolve `applications` to image tags as part of `plan`
    #[serde(default = "default_true")]
    pub resolve_applications: bool,

    #[serde(default)]
    pub applications: Vec<Application>,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Manifest file locations, relative to the workspace unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_images_file")]
    pub images_file: PathBuf,

    #[serde(default = "default_applications_file")]
    pub applications_file: PathBuf,
}

fn default_docker_dir() -> PathBuf {
    PathBuf::from("docker")
}

fn default_images_file() -> PathBuf {
    PathBuf::from("docker_images.json")
}

fn default_applications_file() -> PathBuf {
    PathBuf::from("applications.json")
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_file: default_images_file(),
            applications_file: default_applications_file(),
        }
    }
}

impl Default for ImprintConfig {
    fn default() -> Self {
        Self {
            docker_dir: default_docker_dir(),
            repository: String::new(),
            resolve_applications: default_true(),
            applications: Vec::new(),
            registry: RegistryConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Repository(String),
    Application(String, String),
    Registry(String),
    Paths(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Repository(msg) => write!(f, "Repository: {}", msg),
            ValidationError::Application(name, msg) => {
                write!(f, "Application '{}': {}", name, msg)
            }
            ValidationError::Registry(msg) => write!(f, "Registry: {}", msg),
            ValidationError::Paths(msg) => write!(f, "Paths: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Docker repository path: lowercase components of `[a-z0-9._-]` joined by `/`
fn is_valid_repository(repository: &str) -> bool {
    repository.split('/').all(|component| {
        !component.is_empty()
            && component
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c))
    })
}

impl ImprintConfig {
    /// Validate the entire configuration
    ///
    /// An empty repository is allowed here; commands that query the registry
    /// require it separately.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !self.repository.is_empty() && !is_valid_repository(&self.repository) {
            errors.push(ValidationError::Repository(format!(
                "'{}' is not a valid repository name",
                self.repository
            )));
        }

        if self.docker_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Paths("docker_dir cannot be empty".to_string()));
        }
        if self.output.images_file.as_os_str().is_empty() {
            errors.push(ValidationError::Paths("images_file cannot be empty".to_string()));
        }
        if self.output.applications_file.as_os_str().is_empty() {
            errors.push(ValidationError::Paths(
                "applications_file cannot be empty".to_string(),
            ));
        }

        if let Err(e) = self.registry.validate() {
            errors.push(ValidationError::Registry(e));
        }

        let mut seen = HashSet::new();
        for app in &self.applications {
            if app.app_name.is_empty() {
                errors.push(ValidationError::Application(
                    app.app_name.clone(),
                    "app_name cannot be empty".to_string(),
                ));
            }
            if app.image_name.is_empty() {
                errors.push(ValidationError::Application(
                    app.app_name.clone(),
                    "image_name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(app.app_name.as_str()) {
                errors.push(ValidationError::Application(
                    app.app_name.clone(),
                    "defined more than once".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolve a configured path against the workspace root
    pub fn resolve_path(workspace_root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            workspace_root.join(path)
        }
    }
}
