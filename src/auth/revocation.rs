//! Revocation Cache
//!
//! Marks session tokens revoked before their natural expiry (logout). Markers
//! live in the shared store under their own prefix.

use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::cache::SharedCache;
use crate::memo::KEY_DELIMITER;

pub const REVOKED_TOKEN_PREFIX: &str = "revokedToken";

/// Longest lifetime of a session token; a marker never needs to outlive it.
pub const REVOCATION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct RevocationCache {
    cache: SharedCache,
}

impl RevocationCache {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    /// Revokes the token with id `jti` for the next hour.
    pub async fn revoke_token(&self, jti: &str) {
        self.cache
            .write()
            .await
            .set(marker_key(jti), Value::Bool(true), Some(REVOCATION_TTL));
        info!(jti = %jti, "token revoked");
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.cache.read().await.contains(&marker_key(jti))
    }
}

fn marker_key(jti: &str) -> String {
    format!("{REVOKED_TOKEN_PREFIX}{KEY_DELIMITER}{jti}")
}
