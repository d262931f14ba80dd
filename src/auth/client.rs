//! Remote Platform Client
//!
//! The two calls the gateway makes to an organization's server: the OAuth
//! client-credentials token exchange and the application public-key lookup.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{GatewayError, Result};

/// Longest upstream error body echoed into an error message.
const MAX_ERROR_BODY: usize = 512;

/// Successful reply of the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

// == Platform Client ==
/// RPC seam to the remote platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// `POST {server_url}/oauth/token` with the client-credentials grant.
    async fn request_token(
        &self,
        server_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse>;

    /// `GET {server_url}/api/http/applications/clientId:{client_id}/public-keys`.
    ///
    /// Returns the body parsed once; it may itself be a JSON-encoded string.
    async fn fetch_public_keys(
        &self,
        server_url: &str,
        client_id: &str,
        bearer_token: &str,
    ) -> Result<Value>;
}

pub fn token_url(server_url: &str) -> String {
    format!("{}/oauth/token", server_url.trim_end_matches('/'))
}

/// Public-key endpoint of an application. `client_id` is percent-encoded as one
/// path segment.
pub fn public_keys_url(server_url: &str, client_id: &str) -> Result<String> {
    let app_segment = format!("clientId:{client_id}");
    let mut url = Url::parse(server_url)
        .map_err(|_| GatewayError::invalid(format!("server URL `{server_url}` is not a URL")))?;
    url.path_segments_mut()
        .map_err(|_| GatewayError::invalid(format!("server URL `{server_url}` cannot have a path")))?
        .pop_if_empty()
        .extend(["api", "http", "applications", app_segment.as_str(), "public-keys"]);
    Ok(url.into())
}

/// `Authorization` header value for the client-credentials exchange.
pub fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{client_secret}")))
}

// == HTTP Implementation ==
/// [`PlatformClient`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
}

impl HttpPlatformClient {
    /// Builds a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn request_token(
        &self,
        server_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse> {
        let url = token_url(server_url);
        debug!(url = %url, "exchanging client credentials");

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, basic_credentials(client_id, client_secret))
            .header(ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials"), ("scope", "**")])
            .send()
            .await
            .map_err(transport_error)?;

        let response = ensure_success(response).await?;
        response.json::<TokenResponse>().await.map_err(|e| GatewayError::Upstream {
            status: None,
            message: format!("malformed token response: {e}"),
        })
    }

    async fn fetch_public_keys(
        &self,
        server_url: &str,
        client_id: &str,
        bearer_token: &str,
    ) -> Result<Value> {
        let url = public_keys_url(server_url, client_id)?;
        debug!(url = %url, "fetching application public keys");

        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let body = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Upstream {
            status: None,
            message: format!("public key response is not JSON: {e}"),
        })
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Upstream {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(GatewayError::Upstream {
        status: Some(status.as_u16()),
        message: format!("{} {}", status, body.trim()),
    })
}
