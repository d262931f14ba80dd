//! Integration Tests for the HTTP platform client
//!
//! Runs the reqwest client and the full gateway against a mock platform.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use space_gateway::auth::{
    basic_credentials, BearerTokenProvider, HttpPlatformClient, PlatformClient, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
use space_gateway::cache::{self, CacheStore};
use space_gateway::{create_router, AppState, Config, GatewayError};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{key_set, sign, signing_key, TIMESTAMP};

const KEYS_PATH: &str = "/api/http/applications/clientId:app-id/public-keys";

fn client() -> HttpPlatformClient {
    HttpPlatformClient::new(Duration::from_secs(5)).unwrap()
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("authorization", basic_credentials("app-id", "app-secret").as_str()))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 600,
            "token_type": "Bearer",
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// == Token Exchange Tests ==

#[tokio::test]
async fn test_request_token_sends_client_credentials() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    let response = client()
        .request_token(&server.uri(), "app-id", "app-secret")
        .await
        .unwrap();

    assert_eq!(response.access_token, "tok-1");
    assert_eq!(response.expires_in, Some(600));
}

#[tokio::test]
async fn test_request_token_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let result = client().request_token(&server.uri(), "app-id", "wrong").await;

    match result {
        Err(GatewayError::Upstream { status, message }) => {
            assert_eq!(status, Some(401));
            assert!(message.contains("invalid_client"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bearer_token_reused_across_calls() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    let cache = cache::shared(CacheStore::new(100));
    let tokens = BearerTokenProvider::new(cache, Arc::new(client())).unwrap();

    for _ in 0..3 {
        let token = tokens
            .bearer_token(&server.uri(), "app-id", "app-secret")
            .await
            .unwrap();
        assert_eq!(token, "tok-1");
    }
    // MockServer verifies the single POST on drop
}

// == Public Key Tests ==

#[tokio::test]
async fn test_fetch_public_keys_uses_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_set(signing_key())))
        .expect(1)
        .mount(&server)
        .await;

    let body = client()
        .fetch_public_keys(&server.uri(), "app-id", "tok-1")
        .await
        .unwrap();

    assert_eq!(body["keys"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_fetch_public_keys_not_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let result = client().fetch_public_keys(&server.uri(), "app-id", "tok-1").await;
    assert!(matches!(result, Err(GatewayError::Upstream { status: None, .. })));
}

// == End-to-end ==

#[tokio::test]
async fn test_gateway_against_mock_platform() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_set(signing_key())))
        .expect(2)
        .mount(&server)
        .await;

    let config = Config {
        domain_suffix: "127.0.0.1".to_string(),
        allow_insecure: true,
        ..Config::default()
    };
    let cache = cache::shared(CacheStore::new(100));
    let state = AppState::new(cache, Arc::new(client()), &config).unwrap();
    let app = create_router(state);

    let init = json!({
        "className": "InitPayload",
        "clientId": "app-id",
        "clientSecret": "app-secret",
        "serverUrl": server.uri(),
    });
    let message = json!({"className": "WebhookRequest", "clientId": "app-id", "payload": {}});

    for body in [init, message] {
        let body = body.to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/api/space/webhook")
            .header(TIMESTAMP_HEADER, TIMESTAMP)
            .header(SIGNATURE_HEADER, sign(signing_key(), body.as_bytes()))
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
