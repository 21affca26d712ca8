//! Imprint: Content-Addressed Build Decisions
//!
//! Fingerprints container build contexts by their file contents and asks an
//! image registry which fingerprints are already published, so a pipeline
//! only rebuilds the images whose inputs changed.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod planner;
pub mod registry;
pub mod tree;
pub mod types;

pub use catalog::ImageCatalog;
pub use error::{PlanError, RegistryError, TreeError};
pub use planner::{BuildDecision, BuildPlan, BuildPlanner, ImageDecision};
pub use registry::{HttpRegistryClient, ManifestLookup, RegistryOracle, StaticRegistry};
pub use tree::{hash_tree, PathMatcher, TreeHasher};
pub use types::{Application, ApplicationTag, ImageContext, ImageFingerprint, TreeDigest};
