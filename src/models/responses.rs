//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for an accepted webhook
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAcceptedResponse {
    pub status: String,
    pub class_name: String,
}

impl WebhookAcceptedResponse {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            status: "accepted".to_string(),
            class_name: class_name.into(),
        }
    }
}

/// Response body for `POST /api/auth/revoke`
#[derive(Debug, Clone, Serialize)]
pub struct RevokeResponse {
    pub message: String,
    pub jti: String,
}

impl RevokeResponse {
    pub fn new(jti: impl Into<String>) -> Self {
        let jti = jti.into();
        Self {
            message: format!("Token '{}' revoked", jti),
            jti,
        }
    }
}

/// Response body for `GET /api/auth/revoked/:jti`
#[derive(Debug, Clone, Serialize)]
pub struct RevocationStatusResponse {
    pub jti: String,
    pub revoked: bool,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
