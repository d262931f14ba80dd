//! Shared fixtures for the integration tests: a signing key pair and an
//! in-memory platform.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use async_trait::async_trait;
use axum::body::Body;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use sha2::Sha512;

use space_gateway::auth::{verifiable_data, Jwk, PlatformClient, TokenResponse};
use space_gateway::Result;

pub const TIMESTAMP: &str = "1700000000000";

pub fn signing_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

pub fn foreign_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

/// Public key list in the shape the platform publishes it.
pub fn key_set(key: &RsaPrivateKey) -> Value {
    let jwk = Jwk::from_rsa_public_key(&RsaPublicKey::from(key), Some("k1".to_string()));
    json!({ "keys": [jwk] })
}

/// Signature over `"{TIMESTAMP}:{body}"`, base64 encoded.
pub fn sign(key: &RsaPrivateKey, body: &[u8]) -> String {
    let signing_key = SigningKey::<Sha512>::new(key.clone());
    let signature = signing_key.sign(&verifiable_data(TIMESTAMP, body));
    STANDARD.encode(signature.to_bytes())
}

pub async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Platform that serves fixed public keys and counts calls.
pub struct FakePlatform {
    keys: Value,
    pub token_calls: AtomicUsize,
    pub key_calls: AtomicUsize,
}

impl FakePlatform {
    pub fn new(keys: Value) -> Self {
        Self {
            keys,
            token_calls: AtomicUsize::new(0),
            key_calls: AtomicUsize::new(0),
        }
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn request_token(
        &self,
        _server_url: &str,
        client_id: &str,
        _client_secret: &str,
    ) -> Result<TokenResponse> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenResponse {
            access_token: format!("token-{client_id}"),
            expires_in: Some(600),
            token_type: Some("Bearer".to_string()),
        })
    }

    async fn fetch_public_keys(
        &self,
        _server_url: &str,
        _client_id: &str,
        _bearer_token: &str,
    ) -> Result<Value> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.keys.clone())
    }
}
