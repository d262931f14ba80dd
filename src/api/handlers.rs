//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::{info, warn};

use crate::auth::{
    BearerTokenProvider, DomainPolicy, HttpPlatformClient, OrganizationDirectory, PlatformClient,
    RevocationCache, WebhookRequest, WebhookVerifier,
};
use crate::cache::{self, CacheStore, SharedCache};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::models::{
    HealthResponse, RevocationStatusResponse, RevokeRequest, RevokeResponse, StatsResponse,
    WebhookAcceptedResponse, WebhookEnvelope,
};

/// Application state shared across all handlers.
///
/// Every component that caches reads and writes the same store.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    pub verifier: WebhookVerifier,
    pub revocations: RevocationCache,
    pub organizations: Arc<OrganizationDirectory>,
}

impl AppState {
    /// Wires the gateway components around one shared cache and platform client.
    pub fn new(cache: SharedCache, client: Arc<dyn PlatformClient>, config: &Config) -> Result<Self> {
        let tokens = BearerTokenProvider::new(cache.clone(), client.clone())?;
        let domain = DomainPolicy::new(&config.domain_suffix, config.allow_insecure);
        Ok(Self {
            verifier: WebhookVerifier::new(tokens, client, domain),
            revocations: RevocationCache::new(cache.clone()),
            organizations: Arc::new(OrganizationDirectory::new()),
            cache,
        })
    }

    /// Creates a new AppState from configuration, talking to the platform over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = cache::shared(CacheStore::new(config.max_entries));
        let client = HttpPlatformClient::new(config.http_timeout())?;
        Self::new(cache, Arc::new(client), config)
    }
}

/// Handler for POST /api/space/webhook
///
/// An `InitPayload` is verified against the credentials it carries and then
/// registers the organization. Every other payload is verified against the
/// credentials registered for its `clientId`.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAcceptedResponse>> {
    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::BadRequest(format!("invalid webhook body: {e}")))?;
    if let Some(error_msg) = envelope.validate() {
        return Err(GatewayError::BadRequest(error_msg));
    }

    let request = WebhookRequest::from_headers(&headers, &body);

    if envelope.is_init() {
        let credentials = envelope
            .init_credentials()
            .map_err(GatewayError::BadRequest)?;
        state.verifier.verify(&credentials, &request).await?;
        state.organizations.register(credentials).await;
    } else {
        let Some(credentials) = state.organizations.find(&envelope.client_id).await else {
            warn!(client_id = %envelope.client_id, "webhook from unknown organization");
            return Err(GatewayError::invalid("unknown clientId"));
        };
        state.verifier.verify(&credentials, &request).await?;
    }

    info!(class_name = %envelope.class_name, client_id = %envelope.client_id, "webhook accepted");
    Ok(Json(WebhookAcceptedResponse::new(envelope.class_name)))
}

/// Handler for POST /api/auth/revoke
pub async fn revoke_handler(
    State(state): State<AppState>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(GatewayError::BadRequest(error_msg));
    }

    state.revocations.revoke_token(&req.jti).await;
    Ok(Json(RevokeResponse::new(req.jti)))
}

/// Handler for GET /api/auth/revoked/:jti
pub async fn revocation_status_handler(
    State(state): State<AppState>,
    Path(jti): Path<String>,
) -> Json<RevocationStatusResponse> {
    let revoked = state.revocations.is_revoked(&jti).await;
    Json(RevocationStatusResponse { jti, revoked })
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(StatsResponse::from(cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
