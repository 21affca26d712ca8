//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{PlanError, RegistryError, TreeError};

/// Map domain errors to a string for CLI output, naming the class of defect.
pub fn map_error(e: &PlanError) -> String {
    let category = match e {
        PlanError::Tree(TreeError::NoMatch { .. })
        | PlanError::Tree(TreeError::InvalidPattern { .. })
        | PlanError::AmbiguousApplicationMapping { .. }
        | PlanError::Config(_) => "configuration error",
        PlanError::Tree(TreeError::Unreadable { .. }) | PlanError::Output { .. } => {
            "filesystem error"
        }
        PlanError::Registry(RegistryError::Client(_)) => "configuration error",
        PlanError::Registry(_) => "registry error",
    };
    format!("{}: {}", category, e)
}
