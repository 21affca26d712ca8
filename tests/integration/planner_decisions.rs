//! End-to-end decision runs: catalog, planner and manifest writer against an
//! in-memory registry

use super::test_utils::write_files;
use imprint::output::PlanWriter;
use imprint::{Application, BuildDecision, BuildPlanner, ImageCatalog, PlanError, StaticRegistry};
use std::fs;
use tempfile::TempDir;

const REPO: &str = "johanlorenzo/test-github-action";

fn app(app_name: &str, image_name: &str) -> Application {
    Application {
        app_name: app_name.to_string(),
        image_name: image_name.to_string(),
    }
}

fn docker_root(temp_dir: &TempDir) -> std::path::PathBuf {
    let root = temp_dir.path().join("docker");
    write_files(
        &root,
        &[
            ("python-ansible/Dockerfile", "FROM python:3.12\nRUN pip install ansible"),
            ("python-tox/Dockerfile", "FROM python:3.12\nRUN pip install tox"),
            ("python-tox/tox.ini", "[tox]"),
        ],
    );
    root
}

#[tokio::test]
async fn test_only_unpublished_tags_are_built() {
    let temp_dir = TempDir::new().unwrap();
    let images = ImageCatalog::new(docker_root(&temp_dir)).enumerate().unwrap();
    let registry = StaticRegistry::new().with_tag(REPO, &images[0].tag, "sha256:ansible");

    let plan = BuildPlanner::new(&registry, REPO)
        .with_concurrency(2)
        .plan(&images, None)
        .await
        .unwrap();

    assert_eq!(plan.decisions.len(), 2);
    assert_eq!(
        plan.decisions[0].decision,
        BuildDecision::Skip {
            digest: "sha256:ansible".to_string()
        }
    );
    assert_eq!(plan.decisions[1].decision, BuildDecision::Build);
    assert_eq!(plan.build_set(), vec![&images[1]]);

    let queried: Vec<String> = registry.queries().into_iter().map(|(_, tag)| tag).collect();
    assert_eq!(queried.len(), 2);
    assert!(registry.queries().iter().all(|(repo, _)| repo == REPO));
}

#[tokio::test]
async fn test_second_run_after_publish_builds_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let images = ImageCatalog::new(docker_root(&temp_dir)).enumerate().unwrap();
    let registry = images
        .iter()
        .fold(StaticRegistry::new(), |registry, image| {
            registry.with_tag(REPO, &image.tag, "sha256:published")
        });

    let plan = BuildPlanner::new(&registry, REPO)
        .plan(&images, None)
        .await
        .unwrap();

    assert!(plan.build_set().is_empty());
    assert_eq!(plan.existing().len(), 2);
}

#[tokio::test]
async fn test_plan_writes_manifests() {
    let temp_dir = TempDir::new().unwrap();
    let images = ImageCatalog::new(docker_root(&temp_dir)).enumerate().unwrap();
    let registry = StaticRegistry::new();
    let apps = vec![
        app("my-ansible-app", "python-ansible"),
        app("my-other-ansible-app", "python-ansible"),
        app("my-tox-app", "python-tox"),
    ];

    let plan = BuildPlanner::new(&registry, REPO)
        .plan(&images, Some(apps.as_slice()))
        .await
        .unwrap();

    let images_path = temp_dir.path().join("out").join("docker_images.json");
    let apps_path = temp_dir.path().join("out").join("applications.json");
    let written = PlanWriter::new(&images_path, &apps_path).write(&plan).unwrap();
    assert_eq!(written.applications.as_deref(), Some(apps_path.as_path()));

    let images_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&images_path).unwrap()).unwrap();
    assert_eq!(
        images_json,
        serde_json::json!([
            { "image_name": "python-ansible", "image_tag": images[0].tag },
            { "image_name": "python-tox", "image_tag": images[1].tag },
        ])
    );

    let apps_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&apps_path).unwrap()).unwrap();
    assert_eq!(
        apps_json,
        serde_json::json!([
            { "app_name": "my-ansible-app", "image_tag": images[0].tag },
            { "app_name": "my-other-ansible-app", "image_tag": images[0].tag },
            { "app_name": "my-tox-app", "image_tag": images[1].tag },
        ])
    );
}

#[tokio::test]
async fn test_unknown_application_fails_without_queries_or_output() {
    let temp_dir = TempDir::new().unwrap();
    let images = ImageCatalog::new(docker_root(&temp_dir)).enumerate().unwrap();
    let registry = StaticRegistry::new();

    let result = BuildPlanner::new(&registry, REPO)
        .plan(&images, Some(&[app("web", "python-django")][..]))
        .await;

    match result {
        Err(PlanError::AmbiguousApplicationMapping {
            app_name,
            image_name,
            matches,
        }) => {
            assert_eq!(app_name, "web");
            assert_eq!(image_name, "python-django");
            assert!(matches.is_empty());
        }
        other => panic!("expected mapping error, got {:?}", other.map(|p| p.decisions.len())),
    }
    assert!(registry.queries().is_empty());
}

#[tokio::test]
async fn test_registry_error_aborts_run() {
    let temp_dir = TempDir::new().unwrap();
    let images = ImageCatalog::new(docker_root(&temp_dir)).enumerate().unwrap();
    let registry = StaticRegistry::new().with_failure(REPO, &images[1].tag, "connection reset");

    let err = BuildPlanner::new(&registry, REPO)
        .plan(&images, None)
        .await
        .unwrap_err();

    assert!(matches!(err, PlanError::Registry(_)));
    assert!(err.to_string().contains("connection reset"));
}
