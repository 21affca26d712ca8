//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override these key by key; tables merge, arrays replace.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("docker_dir", "docker")?
        .set_default("resolve_applications", true)?
        .set_default("output.images_file", "docker_images.json")?
        .set_default("output.applications_file", "applications.json")?
        .set_default("registry.auth_url", "https://auth.docker.io/token")?
        .set_default("registry.service", "registry.docker.io")?
        .set_default("registry.registry_url", "https://index.docker.io")
}
