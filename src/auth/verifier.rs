//! Webhook Authenticity Verifier
//!
//! Confirms that an inbound webhook was signed by the organization it claims to
//! come from. The platform signs `"{timestamp}:{body}"` with RSA-SHA512
//! (PKCS#1 v1.5) and publishes the verifying keys per application.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha2::Sha512;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{parse_key_set, BearerTokenProvider, Jwk, PlatformClient};
use crate::error::{GatewayError, Result};

pub const TIMESTAMP_HEADER: &str = "x-space-timestamp";
pub const SIGNATURE_HEADER: &str = "x-space-public-key-signature";

// == Request Types ==
/// Credentials of an installed organization.
#[derive(Clone, PartialEq, Eq)]
pub struct OrgCredentials {
    pub server_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl OrgCredentials {
    pub fn new(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for OrgCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrgCredentials")
            .field("server_url", &self.server_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// The parts of an inbound webhook the signature covers.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
    /// Raw body exactly as received
    pub body: &'a [u8],
}

impl<'a> WebhookRequest<'a> {
    pub fn from_headers(headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        Self {
            timestamp: header_str(headers, TIMESTAMP_HEADER),
            signature: header_str(headers, SIGNATURE_HEADER),
            body,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The exact byte string the platform signs.
pub fn verifiable_data(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(timestamp.len() + 1 + body.len());
    data.extend_from_slice(timestamp.as_bytes());
    data.push(b':');
    data.extend_from_slice(body);
    data
}

/// True when any of `keys` verifies `signature_b64` over `data`.
pub fn verify_signature(keys: &[Jwk], data: &[u8], signature_b64: &str) -> bool {
    let Ok(raw) = STANDARD.decode(signature_b64.trim()) else {
        debug!("signature header is not base64");
        return false;
    };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        return false;
    };

    keys.iter()
        .filter_map(|jwk| match jwk.to_rsa_public_key() {
            Ok(key) => Some((jwk, key)),
            Err(err) => {
                debug!(kid = ?jwk.kid, error = %err, "skipping unusable public key");
                None
            }
        })
        .any(|(jwk, key)| {
            let verified = VerifyingKey::<Sha512>::new(key).verify(data, &signature).is_ok();
            if verified {
                debug!(kid = ?jwk.kid, "signature verified");
            }
            verified
        })
}

// == Domain Policy ==
/// Which organization hosts are trusted.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    suffix: String,
    allow_insecure: bool,
}

impl DomainPolicy {
    pub fn new(suffix: &str, allow_insecure: bool) -> Self {
        Self {
            suffix: suffix.trim().trim_start_matches('.').to_ascii_lowercase(),
            allow_insecure,
        }
    }

    /// Rejects server URLs outside the platform domain.
    pub fn check(&self, server_url: &str) -> Result<()> {
        let url = Url::parse(server_url)
            .map_err(|_| GatewayError::invalid(format!("server URL `{server_url}` is not a URL")))?;

        let scheme_ok = match url.scheme() {
            "https" => true,
            "http" => self.allow_insecure,
            _ => false,
        };
        if !scheme_ok {
            return Err(GatewayError::invalid(format!(
                "server URL scheme `{}` is not allowed",
                url.scheme()
            )));
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let trusted = host == self.suffix || host.ends_with(&format!(".{}", self.suffix));
        if !trusted {
            return Err(GatewayError::invalid(format!(
                "host `{host}` is not under `{}`",
                self.suffix
            )));
        }
        Ok(())
    }
}

// == Verifier ==
/// Per-request authenticity gate. Holds no per-request state.
#[derive(Clone)]
pub struct WebhookVerifier {
    tokens: BearerTokenProvider,
    client: Arc<dyn PlatformClient>,
    domain: DomainPolicy,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("domain", &self.domain)
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(
        tokens: BearerTokenProvider,
        client: Arc<dyn PlatformClient>,
        domain: DomainPolicy,
    ) -> Self {
        Self {
            tokens,
            client,
            domain,
        }
    }

    /// Succeeds only when one of the organization's current public keys verifies
    /// the request signature.
    ///
    /// The domain and header checks run before any network call. The public-key
    /// list is fetched fresh on every call.
    pub async fn verify(&self, org: &OrgCredentials, request: &WebhookRequest<'_>) -> Result<()> {
        self.domain.check(&org.server_url)?;

        let timestamp = required(request.timestamp, TIMESTAMP_HEADER)?;
        let signature = required(request.signature, SIGNATURE_HEADER)?;

        let token = self
            .tokens
            .bearer_token(&org.server_url, &org.client_id, &org.client_secret)
            .await?;
        let body = self
            .client
            .fetch_public_keys(&org.server_url, &org.client_id, &token)
            .await?;
        let keys = parse_key_set(body)?;
        if keys.is_empty() {
            warn!(client_id = %org.client_id, "organization published no public keys");
            return Err(GatewayError::invalid("no public keys available"));
        }

        let data = verifiable_data(timestamp, request.body);
        if verify_signature(&keys, &data, signature) {
            info!(client_id = %org.client_id, "webhook signature verified");
            Ok(())
        } else {
            warn!(client_id = %org.client_id, candidates = keys.len(), "webhook signature rejected");
            Err(GatewayError::invalid("signature does not match any public key"))
        }
    }
}

fn required<'a>(value: Option<&'a str>, header: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::invalid(format!("missing `{header}` header")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{jwk_for, other_private_key, sign, test_private_key, StubPlatform};
    use crate::cache::{self, CacheStore};
    use serde_json::{json, Value};

    const BODY: &[u8] = br#"{"className":"WebhookRequest","clientId":"app","payload":{"issue":1}}"#;
    const TIMESTAMP: &str = "1700000000000";

    fn org() -> OrgCredentials {
        OrgCredentials::new("https://acme.jetbrains.space", "app", "secret")
    }

    fn verifier_with(keys: Value) -> (Arc<StubPlatform>, WebhookVerifier) {
        let stub = Arc::new(StubPlatform::new().with_keys(keys));
        let store = cache::shared(CacheStore::default());
        let tokens = BearerTokenProvider::new(store, stub.clone()).unwrap();
        let verifier = WebhookVerifier::new(tokens, stub.clone(), DomainPolicy::new("jetbrains.space", false));
        (stub, verifier)
    }

    fn valid_keys() -> Value {
        json!({ "keys": [jwk_for(other_private_key(), "old"), jwk_for(test_private_key(), "current")] })
    }

    fn signed() -> String {
        sign(test_private_key(), &verifiable_data(TIMESTAMP, BODY))
    }

    #[test]
    fn test_verifiable_data_layout() {
        assert_eq!(verifiable_data("123", b"{\"a\":1}"), b"123:{\"a\":1}".to_vec());
    }

    #[test]
    fn test_signature_round_trip() {
        let keys = vec![jwk_for(test_private_key(), "k")];
        let data = verifiable_data(TIMESTAMP, BODY);
        let signature = signed();

        assert!(verify_signature(&keys, &data, &signature));
    }

    #[test]
    fn test_any_flipped_byte_fails() {
        let keys = vec![jwk_for(test_private_key(), "k")];
        let signature = signed();

        let mut body = BODY.to_vec();
        body[10] ^= 0x01;
        assert!(!verify_signature(&keys, &verifiable_data(TIMESTAMP, &body), &signature));

        assert!(!verify_signature(&keys, &verifiable_data("1700000000001", BODY), &signature));

        let mut raw = STANDARD.decode(&signature).unwrap();
        raw[0] ^= 0x01;
        assert!(!verify_signature(&keys, &verifiable_data(TIMESTAMP, BODY), &STANDARD.encode(raw)));
    }

    #[test]
    fn test_garbage_signature_fails() {
        let keys = vec![jwk_for(test_private_key(), "k")];
        assert!(!verify_signature(&keys, b"data", "%%% not base64"));
        assert!(!verify_signature(&keys, b"data", ""));
    }

    #[test]
    fn test_domain_policy() {
        let policy = DomainPolicy::new(".JetBrains.Space", false);

        assert!(policy.check("https://acme.jetbrains.space").is_ok());
        assert!(policy.check("https://ACME.jetbrains.space/").is_ok());
        assert!(policy.check("https://evil.example.com").is_err());
        assert!(policy.check("https://acme.jetbrains.space.evil.com").is_err());
        assert!(policy.check("https://notjetbrains.space").is_err());
        assert!(policy.check("http://acme.jetbrains.space").is_err());
        assert!(policy.check("not a url").is_err());

        let insecure = DomainPolicy::new("jetbrains.space", true);
        assert!(insecure.check("http://acme.jetbrains.space").is_ok());
    }

    #[tokio::test]
    async fn test_verify_accepts_signed_request() {
        let (stub, verifier) = verifier_with(valid_keys());
        let signature = signed();
        let request = WebhookRequest {
            timestamp: Some(TIMESTAMP),
            signature: Some(&signature),
            body: BODY,
        };

        verifier.verify(&org(), &request).await.unwrap();
        verifier.verify(&org(), &request).await.unwrap();

        assert_eq!(stub.token_calls(), 1, "bearer token is reused");
        assert_eq!(stub.key_calls(), 2, "public keys are fetched per request");
    }

    #[tokio::test]
    async fn test_verify_rejects_foreign_domain_before_network() {
        let (stub, verifier) = verifier_with(valid_keys());
        let signature = signed();
        let evil = OrgCredentials::new("https://evil.example.com", "app", "secret");
        let request = WebhookRequest {
            timestamp: Some(TIMESTAMP),
            signature: Some(&signature),
            body: BODY,
        };

        let err = verifier.verify(&evil, &request).await.unwrap_err();

        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert_eq!(stub.token_calls(), 0);
        assert_eq!(stub.key_calls(), 0);
    }

    #[tokio::test]
    async fn test_verify_requires_headers() {
        let (stub, verifier) = verifier_with(valid_keys());
        let signature = signed();

        let no_timestamp = WebhookRequest {
            timestamp: None,
            signature: Some(&signature),
            body: BODY,
        };
        let blank_signature = WebhookRequest {
            timestamp: Some(TIMESTAMP),
            signature: Some("  "),
            body: BODY,
        };

        for request in [no_timestamp, blank_signature] {
            let err = verifier.verify(&org(), &request).await.unwrap_err();
            assert!(matches!(err, GatewayError::InvalidRequest(_)));
        }
        assert_eq!(stub.key_calls(), 0);
    }

    #[tokio::test]
    async fn test_verify_rejects_unknown_signer() {
        let (_, verifier) = verifier_with(json!({ "keys": [jwk_for(other_private_key(), "old")] }));
        let signature = signed();
        let request = WebhookRequest {
            timestamp: Some(TIMESTAMP),
            signature: Some(&signature),
            body: BODY,
        };

        let err = verifier.verify(&org(), &request).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_verify_rejects_empty_key_set() {
        let (_, verifier) = verifier_with(json!({ "keys": [] }));
        let signature = signed();
        let request = WebhookRequest {
            timestamp: Some(TIMESTAMP),
            signature: Some(&signature),
            body: BODY,
        };

        assert!(verifier.verify(&org(), &request).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_tolerates_double_encoded_keys() {
        let (_, verifier) = verifier_with(Value::String(valid_keys().to_string()));
        let signature = signed();
        let request = WebhookRequest {
            timestamp: Some(TIMESTAMP),
            signature: Some(&signature),
            body: BODY,
        };

        verifier.verify(&org(), &request).await.unwrap();
    }

    #[test]
    fn test_request_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, "42".parse().unwrap());
        headers.insert(SIGNATURE_HEADER, "c2ln".parse().unwrap());

        let request = WebhookRequest::from_headers(&headers, b"{}");

        assert_eq!(request.timestamp, Some("42"));
        assert_eq!(request.signature, Some("c2ln"));
        assert_eq!(request.body, b"{}");
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let rendered = format!("{:?}", org());
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("<redacted>"));
    }
}
