//! Manifest writer for build plans
//!
//! Writes the list of images to build and the application tag list as JSON.
//! Both files are staged next to their targets and only persisted once every
//! file has been serialised. Each rename is atomic but the pair is not: the
//! application list is persisted first and the image list last, so a fresh
//! `docker_images.json` implies its `applications.json` is fresh too.

use crate::error::PlanError;
use crate::planner::BuildPlan;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Paths written by [`PlanWriter::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenManifests {
    pub images: PathBuf,
    pub applications: Option<PathBuf>,
}

pub struct PlanWriter {
    images_path: PathBuf,
    applications_path: PathBuf,
}

impl PlanWriter {
    pub fn new(images_path: impl Into<PathBuf>, applications_path: impl Into<PathBuf>) -> Self {
        Self {
            images_path: images_path.into(),
            applications_path: applications_path.into(),
        }
    }

    /// Write `[{image_name, image_tag}]` for the build set and, when the plan
    /// resolved applications, `[{app_name, image_tag}]`
    pub fn write(&self, plan: &BuildPlan) -> Result<WrittenManifests, PlanError> {
        let images = stage(&self.images_path, &plan.build_set())?;
        let applications = plan
            .application_tags
            .as_ref()
            .map(|tags| stage(&self.applications_path, tags))
            .transpose()?;

        if let Some(staged) = applications {
            persist(staged, &self.applications_path)?;
        }
        persist(images, &self.images_path)?;

        info!(
            images = %self.images_path.display(),
            to_build = plan.build_set().len(),
            "Wrote build manifests"
        );
        Ok(WrittenManifests {
            images: self.images_path.clone(),
            applications: plan
                .application_tags
                .as_ref()
                .map(|_| self.applications_path.clone()),
        })
    }
}

fn output_error(path: &Path, message: impl ToString) -> PlanError {
    PlanError::Output {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn stage<T: Serialize + ?Sized>(target: &Path, value: &T) -> Result<NamedTempFile, PlanError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| output_error(target, e))?;

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| output_error(target, e))?;
    serde_json::to_writer(&mut staged, value).map_err(|e| output_error(target, e))?;
    staged.flush().map_err(|e| output_error(target, e))?;
    Ok(staged)
}

fn persist(staged: NamedTempFile, target: &Path) -> Result<(), PlanError> {
    staged
        .persist(target)
        .map(|_| ())
        .map_err(|e| output_error(target, e.error))
}
