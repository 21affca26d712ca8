//! CLI presentation: text and json formatters per command.

use crate::cli::parse::ConfigFormat;
use crate::config::ImprintConfig;
use crate::error::PlanError;
use crate::output::WrittenManifests;
use crate::planner::{BuildDecision, BuildPlan};
use crate::tree::TreeListing;
use crate::types::ImageFingerprint;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde_json::json;

fn json_error(e: serde_json::Error) -> PlanError {
    PlanError::Config(format!("Failed to serialize output: {}", e))
}

pub fn format_plan_text(plan: &BuildPlan, written: Option<&WrittenManifests>) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Image", "Tag", "Action", "Registry digest"]);
    for d in &plan.decisions {
        let (action, digest) = match &d.decision {
            BuildDecision::Build => ("build", "-"),
            BuildDecision::Skip { digest } => ("skip", digest.as_str()),
        };
        table.add_row(vec![d.image.name.as_str(), d.image.tag.as_str(), action, digest]);
    }

    let mut s = table.to_string();

    if let Some(tags) = &plan.application_tags {
        let mut apps = Table::new();
        apps.load_preset(UTF8_FULL);
        apps.set_header(vec!["Application", "Image tag"]);
        for t in tags {
            apps.add_row(vec![t.app_name.as_str(), t.image_tag.as_str()]);
        }
        s.push('\n');
        s.push_str(&apps.to_string());
    }

    s.push_str(&format!(
        "\n{} of {} images need a build",
        plan.build_set().len(),
        plan.decisions.len()
    ));

    if let Some(written) = written {
        s.push_str(&format!("\nWrote {}", written.images.display()));
        if let Some(apps) = &written.applications {
            s.push_str(&format!("\nWrote {}", apps.display()));
        }
    }
    s
}

/// Manifest-shaped JSON: `docker_images`, optional `applications`, and the
/// per-image decisions
pub fn format_plan_json(plan: &BuildPlan) -> Result<String, PlanError> {
    let mut out = json!({
        "docker_images": plan.build_set(),
        "decisions": plan.decisions,
    });
    if let Some(tags) = &plan.application_tags {
        out["applications"] = json!(tags);
    }
    serde_json::to_string_pretty(&out).map_err(json_error)
}

pub fn format_fingerprints_json(fingerprints: &[ImageFingerprint]) -> Result<String, PlanError> {
    serde_json::to_string(fingerprints).map_err(json_error)
}

/// `sha256sum`-style listing followed by the tree digest
pub fn format_listing_text(listing: &TreeListing, list_files: bool) -> String {
    if !list_files {
        return listing.digest.to_hex();
    }
    let mut lines: Vec<String> = listing
        .files
        .iter()
        .map(|f| format!("{}  {}", hex::encode(f.content_hash), f.relative))
        .collect();
    lines.push(format!("{}  (tree, {} files)", listing.digest, listing.files.len()));
    lines.join("\n")
}

pub fn format_config(config: &ImprintConfig, format: ConfigFormat) -> Result<String, PlanError> {
    let mut shown = config.clone();
    if shown.registry.password.is_some() {
        shown.registry.password = Some("********".to_string());
    }
    match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&shown).map_err(json_error),
        ConfigFormat::Toml => toml::to_string_pretty(&shown)
            .map_err(|e| PlanError::Config(format!("Failed to serialize config: {}", e))),
    }
}
