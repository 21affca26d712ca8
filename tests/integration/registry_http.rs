//! HTTP registry client against a local stub registry

use imprint::registry::{HttpRegistryClient, ManifestLookup, RegistryConfig, RegistryOracle};
use imprint::RegistryError;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const REPO: &str = "org/images";
const DIGEST: &str = "sha256:0f0e0d0c0b0a09080706050403020100";

/// One request as seen by the stub
#[derive(Debug, Clone)]
struct Seen {
    target: String,
    authorization: Option<String>,
    accept: Option<String>,
}

struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl Reply {
    fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    fn manifest(digest: &str) -> Self {
        Self {
            status: 200,
            headers: vec![("Docker-Content-Digest", digest.to_string())],
            body: "{}".to_string(),
        }
    }

    fn json(body: &str) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type", "application/json".to_string())],
            body: body.to_string(),
        }
    }
}

type Router = Arc<dyn Fn(&str, Option<&str>) -> Reply + Send + Sync>;

/// Serve `router` on an ephemeral port; returns the base URL and request log
async fn stub_registry(router: Router) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }

            let request = String::from_utf8_lossy(&buf).into_owned();
            let mut lines = request.lines();
            let target = lines
                .next()
                .and_then(|line| line.split_whitespace().nth(1))
                .unwrap_or("/")
                .to_string();
            let header = |name: &str| {
                request.lines().skip(1).find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.eq_ignore_ascii_case(name)
                        .then(|| value.trim().to_string())
                })
            };
            let request_seen = Seen {
                target: target.clone(),
                authorization: header("authorization"),
                accept: header("accept"),
            };
            log.lock().push(request_seen.clone());

            let path = target.split('?').next().unwrap_or("/");
            let reply = router(path, request_seen.authorization.as_deref());

            let mut response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n",
                reply.status,
                reply.body.len()
            );
            for (name, value) in &reply.headers {
                response.push_str(&format!("{}: {}\r\n", name, value));
            }
            response.push_str("\r\n");
            response.push_str(&reply.body);
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (base, seen)
}

fn config(registry_url: &str, auth_url: &str) -> RegistryConfig {
    RegistryConfig {
        registry_url: registry_url.to_string(),
        auth_url: auth_url.to_string(),
        service: "registry.test".to_string(),
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
        ..RegistryConfig::default()
    }
}

fn anonymous_router() -> Router {
    Arc::new(|path: &str, _: Option<&str>| match path {
        "/v2/org/images/manifests/published" => Reply::manifest(DIGEST),
        "/v2/org/images/manifests/broken" => Reply::status(500),
        "/v2/org/images/manifests/no-digest" => Reply::json("{}"),
        _ => Reply::status(404),
    })
}

#[tokio::test]
async fn test_lookup_without_token_exchange() {
    let (base, seen) = stub_registry(anonymous_router()).await;
    let client = HttpRegistryClient::new(config(&base, "")).unwrap();

    assert_eq!(
        client.lookup(REPO, "published").await.unwrap(),
        ManifestLookup::Found {
            digest: DIGEST.to_string()
        }
    );
    assert_eq!(
        client.lookup(REPO, "missing").await.unwrap(),
        ManifestLookup::NotFound
    );
    assert!(!client.exists(REPO, "missing").await.unwrap());
    assert_eq!(
        client.current_digest(REPO, "published").await.unwrap().as_deref(),
        Some(DIGEST)
    );

    let seen = seen.lock().clone();
    assert_eq!(seen[0].target, "/v2/org/images/manifests/published");
    assert!(seen.iter().all(|s| s.authorization.is_none()));
    let accept = seen[0].accept.clone().unwrap();
    assert!(accept.contains("application/vnd.docker.distribution.manifest.v2+json"));
    assert!(accept.contains("application/vnd.oci.image.manifest.v1+json"));
}

#[tokio::test]
async fn test_server_error_is_transport_error() {
    let (base, _) = stub_registry(anonymous_router()).await;
    let client = HttpRegistryClient::new(config(&base, "")).unwrap();

    let err = client.lookup(REPO, "broken").await.unwrap_err();

    match err {
        RegistryError::Transport { repository, tag, message } => {
            assert_eq!(repository, REPO);
            assert_eq!(tag, "broken");
            assert!(message.contains("500"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_success_without_digest_header() {
    let (base, _) = stub_registry(anonymous_router()).await;
    let client = HttpRegistryClient::new(config(&base, "")).unwrap();

    let err = client.lookup(REPO, "no-digest").await.unwrap_err();

    assert!(matches!(err, RegistryError::MissingDigest { ref tag, .. } if tag == "no-digest"));
}

#[tokio::test]
async fn test_bearer_token_exchanged_once_per_repository() {
    let router: Router = Arc::new(|path: &str, authorization: Option<&str>| match path {
        "/token" => Reply::json(r#"{"token":"pull-token","expires_in":300}"#),
        _ if authorization != Some("Bearer pull-token") => Reply::status(401),
        "/v2/org/images/manifests/published" => Reply::manifest(DIGEST),
        _ => Reply::status(404),
    });
    let (base, seen) = stub_registry(router).await;
    let client = HttpRegistryClient::new(config(&base, &format!("{}/token", base))).unwrap();

    assert!(client.exists(REPO, "published").await.unwrap());
    assert!(!client.exists(REPO, "other").await.unwrap());

    let seen = seen.lock().clone();
    let token_requests: Vec<&Seen> = seen.iter().filter(|s| s.target.starts_with("/token")).collect();
    assert_eq!(token_requests.len(), 1);
    assert!(token_requests[0].target.contains("service=registry.test"));
    assert!(token_requests[0]
        .target
        .contains("scope=repository%3Aorg%2Fimages%3Apull"));
    assert!(token_requests[0].authorization.is_none());
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn test_access_token_field_and_basic_credentials() {
    let router: Router = Arc::new(|path: &str, authorization: Option<&str>| match path {
        "/token" if authorization == Some("Basic Ym90OnNlY3JldA==") => {
            Reply::json(r#"{"access_token":"oauth-token"}"#)
        }
        "/token" => Reply::status(401),
        _ if authorization == Some("Bearer oauth-token") => Reply::manifest(DIGEST),
        _ => Reply::status(401),
    });
    let (base, _) = stub_registry(router).await;
    let mut registry_config = config(&base, &format!("{}/token", base));
    registry_config.username = Some("bot".to_string());
    registry_config.password = Some("secret".to_string());
    let client = HttpRegistryClient::new(registry_config).unwrap();

    assert!(client.exists(REPO, "anything").await.unwrap());
}

#[tokio::test]
async fn test_rejected_token_request_is_auth_failure() {
    let router: Router = Arc::new(|_: &str, _: Option<&str>| Reply::status(401));
    let (base, seen) = stub_registry(router).await;
    let client = HttpRegistryClient::new(config(&base, &format!("{}/token", base))).unwrap();

    let err = client.lookup(REPO, "published").await.unwrap_err();

    assert!(matches!(err, RegistryError::AuthFailed { ref repository, .. } if repository == REPO));
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_unreachable_registry_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = HttpRegistryClient::new(config(&base, "")).unwrap();

    let err = client.lookup(REPO, "published").await.unwrap_err();

    assert!(matches!(err, RegistryError::Transport { .. }));
}
