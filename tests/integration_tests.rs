//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML profile → credential manager →
//! transport chain → API responses

use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use users_api_client::auth::CredentialManager;
use users_api_client::config::{keys, ClientConfig};
use users_api_client::http::AuthenticatingExecutor;
use users_api_client::{Error, Scope, TokenState};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

async fn mount_token(server: &MockServer, scope: &str, token: &str, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("authorization", "Basic YWJjOnh5eg=="))
        .and(body_string_contains(format!("scope={scope}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": expires_in
        })))
        .mount(server)
        .await;
}

fn profile_yaml(server: &MockServer) -> String {
    format!(
        r"
api_base_url: {uri}/api
oauth2:
  token_url: {uri}/oauth/token
  client_id: abc
  client_secret: xyz
  token_expiry_buffer_ms: 0
http:
  max_retries: 3
  backoff: constant
  initial_backoff_ms: 0
  max_backoff_ms: 0
",
        uri = server.uri()
    )
}

fn client(config: &ClientConfig) -> AuthenticatingExecutor {
    let credentials =
        Arc::new(CredentialManager::new(config.oauth2.clone(), config.http.timeout()).unwrap());
    AuthenticatingExecutor::from_config(config, credentials).unwrap()
}

// ============================================================================
// Profile → Executor Integration Tests
// ============================================================================

#[tokio::test]
async fn test_user_lifecycle_from_profile() {
    let server = MockServer::start().await;
    mount_token(&server, "read", "read-1", 3600).await;
    mount_token(&server, "write", "write-1", 3600).await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer write-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/7"))
        .and(header("authorization", "Bearer read-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Ada"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/7"))
        .and(header("authorization", "Bearer write-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("application-it.yaml"), profile_yaml(&server)).unwrap();
    let config = ClientConfig::load_profile(dir.path(), Some("it")).unwrap();
    let api = client(&config);

    let created = api.post("/users", &json!({"name": "Ada"})).await.unwrap();
    assert_eq!(created.status_code, 201);

    let fetched = api.get("/users/7").await.unwrap();
    let again = api.get("/users/7").await.unwrap();
    let user: serde_json::Value = fetched.json().unwrap();
    assert_eq!(user["name"], "Ada");
    assert_eq!(fetched, again);

    let deleted = api.delete("/users/7").await.unwrap();
    assert_eq!(deleted.status_code, 204);

    // one fetch per scope, reused afterwards
    assert_eq!(api.credentials().fetch_count(), 2);
}

#[tokio::test]
async fn test_config_from_key_value_source() {
    let server = MockServer::start().await;
    mount_token(&server, "read", "read-1", 3600).await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("UP"))
        .expect(1)
        .mount(&server)
        .await;

    let source: HashMap<String, String> = [
        (keys::API_BASE_URL, format!("{}/api", server.uri())),
        (keys::TOKEN_URL, format!("{}/oauth/token", server.uri())),
        (keys::CLIENT_ID, "abc".to_string()),
        (keys::CLIENT_SECRET, "xyz".to_string()),
        (keys::MAX_RETRIES, "1".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let config = ClientConfig::from_source(&source).unwrap();
    assert_eq!(config.http.max_retries, 1);

    let response = client(&config).get("health").await.unwrap();
    assert_eq!(response.body(), "UP");
}

// ============================================================================
// Token Lifecycle Integration Tests
// ============================================================================

#[tokio::test]
async fn test_expired_tokens_refetched_per_request() {
    let server = MockServer::start().await;
    mount_token(&server, "read", "short-lived", 0).await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(3)
        .mount(&server)
        .await;

    let config = ClientConfig::from_yaml_str(&profile_yaml(&server)).unwrap();
    let api = client(&config);

    for _ in 0..3 {
        api.get("/users").await.unwrap();
    }
    assert_eq!(api.credentials().fetch_count(), 3);
}

#[tokio::test]
async fn test_invalidation_round_trip() {
    let server = MockServer::start().await;
    mount_token(&server, "read", "read-1", 3600).await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig::from_yaml_str(&profile_yaml(&server)).unwrap();
    let api = client(&config);
    let credentials = api.credentials();

    api.get("/users").await.unwrap();

    credentials.invalidate().await;
    let err = api.get("/users").await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
    assert_eq!(credentials.token_state(Scope::Read).await, TokenState::Invalidated);

    credentials.validate().await;
    credentials.set_invalid().await;
    let err = api.get("/users").await.unwrap_err();
    assert_eq!(err.to_string(), "Authentication failed: invalid token");

    credentials.validate().await;
    api.get("/users").await.unwrap();
    assert_eq!(credentials.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "shared", "expires_in": 3600}))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer shared"))
        .respond_with(ResponseTemplate::new(200))
        .expect(16)
        .mount(&server)
        .await;

    let config = ClientConfig::from_yaml_str(&profile_yaml(&server)).unwrap();
    let api = Arc::new(client(&config));

    let tasks = (0..16).map(|_| {
        let api = Arc::clone(&api);
        tokio::spawn(async move { api.get("/users").await })
    });
    for result in join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap().status_code, 200);
    }
    assert_eq!(api.credentials().fetch_count(), 1);
}

// ============================================================================
// Transport Chain Integration Tests
// ============================================================================

#[tokio::test]
async fn test_server_errors_retried_with_one_token() {
    let server = MockServer::start().await;
    mount_token(&server, "write", "write-1", 3600).await;
    Mock::given(method("PUT"))
        .and(path("/api/users/3"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/users/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::from_yaml_str(&profile_yaml(&server)).unwrap();
    let api = client(&config);

    let response = api.put("/users/3", &json!({"name": "Grace"})).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(api.credentials().fetch_count(), 1);
}

#[tokio::test]
async fn test_persistent_server_errors_exhaust_attempts() {
    let server = MockServer::start().await;
    mount_token(&server, "read", "read-1", 3600).await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = ClientConfig::from_yaml_str(&profile_yaml(&server)).unwrap();
    let err = client(&config).get("/users").await.unwrap_err();

    assert!(matches!(
        err,
        Error::TransportExhausted {
            attempts: 3,
            last_status: Some(500)
        }
    ));
    assert!(!err.is_authentication());
}

#[tokio::test]
async fn test_api_unauthorized_is_authentication_error() {
    let server = MockServer::start().await;
    mount_token(&server, "read", "read-1", 3600).await;
    Mock::given(method("GET"))
        .and(path("/api/admin"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token revoked"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::from_yaml_str(&profile_yaml(&server)).unwrap();
    let err = client(&config).get("/admin").await.unwrap_err();

    assert!(err.is_authentication());
    assert!(err.to_string().contains("token revoked"));
}
