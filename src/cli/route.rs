//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::catalog::ImageCatalog;
use crate::cli::command_name;
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_config, format_fingerprints_json, format_listing_text, format_plan_json,
    format_plan_text,
};
use crate::config::{ConfigLoader, ImprintConfig};
use crate::error::PlanError;
use crate::output::PlanWriter;
use crate::planner::{BuildPlan, BuildPlanner};
use crate::registry::{HttpRegistryClient, RegistryOracle};
use crate::tree::TreeHasher;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span};

/// Runtime context for one invocation: workspace root and its loaded configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: ImprintConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PlanError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::with_config(workspace_root, config)
    }

    /// Create run context from an already-loaded configuration.
    pub fn with_config(workspace_root: PathBuf, config: ImprintConfig) -> Result<Self, PlanError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            PlanError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &ImprintConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        ImprintConfig::resolve_path(&self.workspace_root, path)
    }

    fn docker_dir(&self, override_dir: Option<&PathBuf>) -> PathBuf {
        self.resolve(override_dir.unwrap_or(&self.config.docker_dir))
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, PlanError> {
        let name = command_name(command);
        let _span = info_span!("command", name).entered();
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, PlanError> {
        match command {
            Commands::Plan {
                docker_dir,
                repository,
                no_applications,
                stdout,
                format,
            } => {
                let docker_dir = self.docker_dir(docker_dir.as_ref());
                let repository = repository
                    .clone()
                    .unwrap_or_else(|| self.config.repository.clone());
                let resolve_applications = self.config.resolve_applications && !*no_applications;
                let registry = HttpRegistryClient::new(self.config.registry.clone())?;

                let plan = self.run_plan(&registry, &docker_dir, &repository, resolve_applications)?;

                if *stdout {
                    return match format {
                        OutputFormat::Json => format_plan_json(&plan),
                        OutputFormat::Text => Ok(format_plan_text(&plan, None)),
                    };
                }

                let writer = PlanWriter::new(
                    self.resolve(&self.config.output.images_file),
                    self.resolve(&self.config.output.applications_file),
                );
                let written = writer.write(&plan)?;
                match format {
                    OutputFormat::Json => format_plan_json(&plan),
                    OutputFormat::Text => Ok(format_plan_text(&plan, Some(&written))),
                }
            }
            Commands::Hashes { docker_dir } => {
                let docker_dir = self.docker_dir(docker_dir.as_ref());
                let fingerprints = ImageCatalog::new(docker_dir).fingerprints()?;
                format_fingerprints_json(&fingerprints)
            }
            Commands::Hash {
                patterns,
                base,
                list,
            } => {
                let base = base
                    .as_ref()
                    .map(|b| self.resolve(b))
                    .unwrap_or_else(|| self.workspace_root.clone());
                let listing = TreeHasher::new(base).listing(patterns)?;
                Ok(format_listing_text(&listing, *list))
            }
            Commands::Config { format } => format_config(&self.config, *format),
        }
    }

    /// Enumerate, resolve and decide against the given registry.
    ///
    /// Runs on its own tokio runtime; the whole plan either completes or fails.
    pub fn run_plan(
        &self,
        registry: &dyn RegistryOracle,
        docker_dir: &Path,
        repository: &str,
        resolve_applications: bool,
    ) -> Result<BuildPlan, PlanError> {
        if repository.is_empty() {
            return Err(PlanError::Config(
                "No registry repository configured; set `repository` or pass --repository"
                    .to_string(),
            ));
        }

        let images = ImageCatalog::new(docker_dir).enumerate()?;
        let applications = resolve_applications.then_some(self.config.applications.as_slice());

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PlanError::Config(format!("Failed to create runtime: {}", e)))?;

        let planner = BuildPlanner::new(registry, repository)
            .with_concurrency(self.config.registry.concurrency);
        rt.block_on(planner.plan(&images, applications))
    }
}
