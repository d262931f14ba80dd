//! Bearer Token Provider
//!
//! Exchanges an organization's client credentials for a short-lived bearer token
//! and keeps it in the shared cache a little less than its validity window.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::auth::PlatformClient;
use crate::cache::SharedCache;
use crate::error::Result;
use crate::memo::{CacheKeySpec, Memoized};

/// Namespace of bearer tokens in the shared cache.
pub const BEARER_TOKEN_PREFIX: &str = "bearerToken";

/// Tokens are valid for 10 minutes; they are reused for 9.
pub const BEARER_TOKEN_TTL: Duration = Duration::from_secs(9 * 60);

type Credentials = (String, String, String);

/// Cached client-credentials token exchange.
#[derive(Debug, Clone)]
pub struct BearerTokenProvider {
    memo: Memoized<Credentials, String>,
}

impl BearerTokenProvider {
    pub fn new(cache: SharedCache, client: Arc<dyn PlatformClient>) -> Result<Self> {
        // Every credential takes part in the key so triples never collide
        let spec = CacheKeySpec::new()
            .prefix(BEARER_TOKEN_PREFIX)
            .key_params(["$[0]", "$[1]", "$[2]"])
            .ttl(BEARER_TOKEN_TTL);

        let memo = Memoized::new(cache, spec, move |(server_url, client_id, client_secret): Credentials| {
            let client = client.clone();
            async move {
                info!(server_url = %server_url, client_id = %client_id, "requesting bearer token");
                let response = client
                    .request_token(&server_url, &client_id, &client_secret)
                    .await?;
                Ok(response.access_token)
            }
        })?;

        Ok(Self { memo })
    }

    /// Returns a bearer token for the organization, without the `Bearer ` prefix.
    pub async fn bearer_token(
        &self,
        server_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String> {
        self.memo.call(credentials(server_url, client_id, client_secret)).await
    }

    /// Forgets the cached token so the next request exchanges credentials again.
    pub async fn invalidate(
        &self,
        server_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<bool> {
        self.memo
            .invalidate(&credentials(server_url, client_id, client_secret))
            .await
    }
}

fn credentials(server_url: &str, client_id: &str, client_secret: &str) -> Credentials {
    (
        server_url.to_string(),
        client_id.to_string(),
        client_secret.to_string(),
    )
}
