//! JSON Web Keys
//!
//! Conversion of the platform's JWK-format public keys into RSA keys, and the
//! lenient parsing of the public-key endpoint's reply.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// One public key as published by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
}

impl Jwk {
    /// Builds the RSA public key from the modulus and exponent.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey> {
        if !self.kty.eq_ignore_ascii_case("RSA") {
            return Err(GatewayError::invalid(format!("unsupported key type `{}`", self.kty)));
        }
        let n = decode_component(self.n.as_deref(), "n")?;
        let e = decode_component(self.e.as_deref(), "e")?;

        RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
            .map_err(|err| GatewayError::invalid(format!("unusable RSA key: {err}")))
    }

    pub fn from_rsa_public_key(key: &RsaPublicKey, kid: Option<String>) -> Self {
        Self {
            kty: "RSA".to_string(),
            n: Some(URL_SAFE_NO_PAD.encode(key.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(key.e().to_bytes_be())),
            kid,
            alg: Some("RS512".to_string()),
            key_use: Some("sig".to_string()),
        }
    }
}

fn decode_component(value: Option<&str>, name: &str) -> Result<Vec<u8>> {
    let value = value.ok_or_else(|| GatewayError::invalid(format!("JWK is missing `{name}`")))?;
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|err| GatewayError::invalid(format!("JWK `{name}` is not base64url: {err}")))
}

// == Key Set Parsing ==
/// Extracts the keys from a public-key response.
///
/// Accepts `{"keys": [...]}` or a bare array, and tolerates either one arriving
/// JSON-encoded inside a string.
pub fn parse_key_set(body: Value) -> Result<Vec<Jwk>> {
    let keys = match decode_nested(body)? {
        Value::Object(mut map) => match map.remove("keys") {
            Some(keys) => decode_nested(keys)?,
            None => return Err(malformed("response has no `keys` field")),
        },
        list @ Value::Array(_) => list,
        _ => return Err(malformed("expected an object or array")),
    };

    serde_json::from_value(keys).map_err(|e| malformed(&e.to_string()))
}

fn decode_nested(value: Value) -> Result<Value> {
    match value {
        Value::String(text) => serde_json::from_str(&text).map_err(|e| malformed(&e.to_string())),
        other => Ok(other),
    }
}

fn malformed(reason: &str) -> GatewayError {
    GatewayError::Upstream {
        status: None,
        message: format!("malformed public key response: {reason}"),
    }
}
