//! Build planner: partitions images into published and needing a build,
//! and resolves applications to the tags they run.

use crate::error::PlanError;
use crate::registry::{ManifestLookup, RegistryOracle};
use crate::types::{Application, ApplicationTag, ImageContext};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, info};

/// Per-image outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BuildDecision {
    Build,
    /// Tag is already published with this registry digest
    Skip { digest: String },
}

impl BuildDecision {
    pub fn needs_build(&self) -> bool {
        matches!(self, BuildDecision::Build)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDecision {
    #[serde(flatten)]
    pub image: ImageContext,
    #[serde(flatten)]
    pub decision: BuildDecision,
}

/// Result of a full decision run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub decisions: Vec<ImageDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_tags: Option<Vec<ApplicationTag>>,
}

impl BuildPlan {
    /// Images that need a build, in input order
    pub fn build_set(&self) -> Vec<&ImageContext> {
        self.decisions
            .iter()
            .filter(|d| d.decision.needs_build())
            .map(|d| &d.image)
            .collect()
    }

    /// Images already published, with their registry digest
    pub fn existing(&self) -> Vec<(&ImageContext, &str)> {
        self.decisions
            .iter()
            .filter_map(|d| match &d.decision {
                BuildDecision::Skip { digest } => Some((&d.image, digest.as_str())),
                BuildDecision::Build => None,
            })
            .collect()
    }
}

/// Resolve every application to the single image carrying its `image_name`
///
/// Zero or several matching images is a configuration error.
pub fn resolve_application_tags(
    applications: &[Application],
    images: &[ImageContext],
) -> Result<Vec<ApplicationTag>, PlanError> {
    applications
        .iter()
        .map(|app| {
            let matches: Vec<&ImageContext> = images
                .iter()
                .filter(|image| image.name == app.image_name)
                .collect();

            match matches.as_slice() {
                [image] => Ok(ApplicationTag {
                    app_name: app.app_name.clone(),
                    image_tag: image.tag.clone(),
                }),
                _ => Err(PlanError::AmbiguousApplicationMapping {
                    app_name: app.app_name.clone(),
                    image_name: app.image_name.clone(),
                    matches: matches.iter().map(|image| image.tag.clone()).collect(),
                }),
            }
        })
        .collect()
}

/// Combines catalog output with registry answers
pub struct BuildPlanner<'a> {
    registry: &'a dyn RegistryOracle,
    repository: String,
    concurrency: usize,
}

impl<'a> BuildPlanner<'a> {
    pub fn new(registry: &'a dyn RegistryOracle, repository: impl Into<String>) -> Self {
        Self {
            registry,
            repository: repository.into(),
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` registry lookups in flight; results keep input order
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Query the registry for every image; fails on the first registry error
    pub async fn decide(&self, images: &[ImageContext]) -> Result<Vec<ImageDecision>, PlanError> {
        let registry = self.registry;
        let repository = self.repository.as_str();

        let decisions: Vec<ImageDecision> = stream::iter(images.iter().cloned())
            .map(move |image| async move {
                let lookup = registry.lookup(repository, &image.tag).await?;
                let decision = match lookup {
                    ManifestLookup::Found { digest } => BuildDecision::Skip { digest },
                    ManifestLookup::NotFound => BuildDecision::Build,
                };
                debug!(image = %image.name, tag = %image.tag, ?decision, "Decided");
                Ok::<_, PlanError>(ImageDecision { image, decision })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(decisions)
    }

    /// Full decision run
    ///
    /// Applications are resolved before any registry query, so a mapping
    /// error fails without network traffic.
    pub async fn plan(
        &self,
        images: &[ImageContext],
        applications: Option<&[Application]>,
    ) -> Result<BuildPlan, PlanError> {
        let application_tags = applications
            .map(|apps| resolve_application_tags(apps, images))
            .transpose()?;

        let decisions = self.decide(images).await?;
        let plan = BuildPlan {
            decisions,
            application_tags,
        };

        info!(
            registry = self.registry.registry_name(),
            repository = %self.repository,
            images = images.len(),
            to_build = plan.build_set().len(),
            "Build plan complete"
        );
        Ok(plan)
    }
}
