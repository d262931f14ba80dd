//! Test doubles shared by the auth unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use sha2::Sha512;

use crate::auth::{Jwk, PlatformClient, TokenResponse};
use crate::error::{GatewayError, Result};

/// Key pair generated once per test binary; RSA key generation is slow.
pub fn test_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

pub fn other_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

pub fn jwk_for(key: &RsaPrivateKey, kid: &str) -> Jwk {
    Jwk::from_rsa_public_key(&RsaPublicKey::from(key), Some(kid.to_string()))
}

/// Base64 RSA-SHA512 signature, as sent in `x-space-public-key-signature`.
pub fn sign(key: &RsaPrivateKey, data: &[u8]) -> String {
    let signing_key = SigningKey::<Sha512>::new(key.clone());
    STANDARD.encode(signing_key.sign(data).to_bytes())
}

/// In-memory remote platform that counts calls.
pub struct StubPlatform {
    token_calls: AtomicUsize,
    key_calls: AtomicUsize,
    fail_tokens: bool,
    keys: Mutex<Value>,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self {
            token_calls: AtomicUsize::new(0),
            key_calls: AtomicUsize::new(0),
            fail_tokens: false,
            keys: Mutex::new(json!({ "keys": [] })),
        }
    }

    pub fn failing_tokens(mut self) -> Self {
        self.fail_tokens = true;
        self
    }

    pub fn with_keys(self, body: Value) -> Self {
        *self.keys.lock().unwrap() = body;
        self
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformClient for StubPlatform {
    async fn request_token(
        &self,
        _server_url: &str,
        client_id: &str,
        _client_secret: &str,
    ) -> Result<TokenResponse> {
        let n = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_tokens {
            return Err(GatewayError::Upstream {
                status: Some(401),
                message: "invalid_client".to_string(),
            });
        }
        Ok(TokenResponse {
            access_token: format!("token-{client_id}-{n}"),
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
        Ok(self.keys.lock().unwrap().clone())
    }
}
