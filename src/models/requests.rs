//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::auth::OrgCredentials;

/// Class name of the payload the platform sends when the application is installed.
pub const INIT_PAYLOAD_CLASS: &str = "InitPayload";

/// The envelope fields every platform webhook body carries.
///
/// Only what routing and verification need is read; the rest of the body is
/// left untouched so the signature still covers the original bytes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub class_name: String,
    pub client_id: String,
    /// Present on `InitPayload` only
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Present on `InitPayload` only
    #[serde(default)]
    pub server_url: Option<String>,
}

impl WebhookEnvelope {
    pub fn is_init(&self) -> bool {
        self.class_name == INIT_PAYLOAD_CLASS
    }

    /// Credentials carried by an install callback.
    ///
    /// Returns an error message if the payload lacks them.
    pub fn init_credentials(&self) -> Result<OrgCredentials, String> {
        match (&self.server_url, &self.client_secret) {
            (Some(server_url), Some(secret)) if !server_url.is_empty() && !secret.is_empty() => Ok(
                OrgCredentials::new(server_url.as_str(), self.client_id.as_str(), secret.as_str()),
            ),
            _ => Err("InitPayload must carry serverUrl and clientSecret".to_string()),
        }
    }

    /// Validates the envelope. Returns an error message if validation fails.
    pub fn validate(&self) -> Option<String> {
        if self.class_name.trim().is_empty() {
            return Some("className cannot be empty".to_string());
        }
        if self.client_id.trim().is_empty() {
            return Some("clientId cannot be empty".to_string());
        }
        None
    }
}

/// Request body for `POST /api/auth/revoke`
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    /// Unique id of the token to revoke
    pub jti: String,
}

impl RevokeRequest {
    pub fn validate(&self) -> Option<String> {
        if self.jti.trim().is_empty() {
            return Some("jti cannot be empty".to_string());
        }
        None
    }
}
