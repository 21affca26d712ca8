//! Docker Registry HTTP API v2 client with bearer-token exchange

use crate::error::RegistryError;
use crate::registry::{ManifestLookup, RegistryOracle};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const MANIFEST_MEDIA_TYPES: &str =
    "application/vnd.docker.distribution.manifest.v2+json, application/vnd.oci.image.manifest.v1+json";
const CONTENT_DIGEST_HEADER: &str = "Docker-Content-Digest";

/// Registry endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Token endpoint; empty disables the token exchange
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// `service` parameter sent to the token endpoint
    #[serde(default = "default_service")]
    pub service: String,

    /// Base URL of the registry API (without `/v2`)
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Lookups in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_auth_url() -> String {
    "https://auth.docker.io/token".to_string()
}

fn default_service() -> String {
    "registry.docker.io".to_string()
}

fn default_registry_url() -> String {
    "https://index.docker.io".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            service: default_service(),
            registry_url: default_registry_url(),
            username: None,
            password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !is_http_url(&self.registry_url) {
            return Err(format!(
                "registry_url must be an http(s) URL, got '{}'",
                self.registry_url
            ));
        }
        if !self.auth_url.is_empty() && !is_http_url(&self.auth_url) {
            return Err(format!(
                "auth_url must be an http(s) URL or empty, got '{}'",
                self.auth_url
            ));
        }
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }
        if self.password.is_some() && self.username.is_none() {
            return Err("password is set without a username".to_string());
        }
        Ok(())
    }

    pub fn token_exchange_enabled(&self) -> bool {
        !self.auth_url.is_empty()
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Registry client speaking the Docker Registry HTTP API v2
///
/// Tokens are cached per repository for the lifetime of the client. Nothing
/// is retried: any failure other than a 404 is returned to the caller.
pub struct HttpRegistryClient {
    client: Client,
    config: RegistryConfig,
    tokens: Mutex<HashMap<String, String>>,
}

impl HttpRegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("imprint/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn manifest_url(&self, repository: &str, tag: &str) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.config.registry_url.trim_end_matches('/'),
            repository,
            tag
        )
    }

    /// Pull-scoped bearer token for `repository`
    async fn token(&self, repository: &str) -> Result<String, RegistryError> {
        let cached = self.tokens.lock().get(repository).cloned();
        if let Some(token) = cached {
            return Ok(token);
        }

        let auth_failed = |message: String| RegistryError::AuthFailed {
            repository: repository.to_string(),
            message,
        };

        let scope = format!("repository:{}:pull", repository);
        let mut request = self.client.get(&self.config.auth_url).query(&[
            ("service", self.config.service.as_str()),
            ("scope", scope.as_str()),
        ]);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| auth_failed(describe_send_error(&e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(auth_failed(format!("token endpoint returned {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_failed(format!("invalid token response: {}", e)))?;
        let token = body
            .token
            .or(body.access_token)
            .ok_or_else(|| auth_failed("token response carried no token".to_string()))?;

        debug!(repository, "Obtained registry token");
        self.tokens
            .lock()
            .insert(repository.to_string(), token.clone());
        Ok(token)
    }
}

fn describe_send_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timeout: {}", error)
    } else if error.is_connect() {
        format!("connection error: {}", error)
    } else {
        format!("HTTP error: {}", error)
    }
}

#[async_trait]
impl RegistryOracle for HttpRegistryClient {
    async fn lookup(&self, repository: &str, tag: &str) -> Result<ManifestLookup, RegistryError> {
        let transport = |message: String| RegistryError::Transport {
            repository: repository.to_string(),
            tag: tag.to_string(),
            message,
        };

        let mut request = self
            .client
            .get(self.manifest_url(repository, tag))
            .header(ACCEPT, MANIFEST_MEDIA_TYPES);
        if self.config.token_exchange_enabled() {
            let token = self.token(repository).await?;
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport(describe_send_error(&e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(repository, tag, "Tag not published");
            return Ok(ManifestLookup::NotFound);
        }
        if !status.is_success() {
            return Err(transport(format!("registry returned {}", status)));
        }

        let digest = response
            .headers()
            .get(CONTENT_DIGEST_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| RegistryError::MissingDigest {
                repository: repository.to_string(),
                tag: tag.to_string(),
            })?;

        info!(repository, tag, digest = %digest, "Tag already published");
        Ok(ManifestLookup::Found { digest })
    }

    fn registry_name(&self) -> &str {
        &self.config.registry_url
    }
}
