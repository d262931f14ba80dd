//! Installed organizations, keyed by the client id the platform assigned.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::info;

use crate::auth::OrgCredentials;

#[derive(Debug, Default)]
pub struct OrganizationDirectory {
    orgs: RwLock<HashMap<String, OrgCredentials>>,
}

impl OrganizationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores credentials, returning the ones they replace.
    pub async fn register(&self, credentials: OrgCredentials) -> Option<OrgCredentials> {
        info!(
            client_id = %credentials.client_id,
            server_url = %credentials.server_url,
            "organization registered"
        );
        self.orgs
            .write()
            .await
            .insert(credentials.client_id.clone(), credentials)
    }

    pub async fn find(&self, client_id: &str) -> Option<OrgCredentials> {
        self.orgs.read().await.get(client_id).cloned()
    }

    pub async fn remove(&self, client_id: &str) -> Option<OrgCredentials> {
        self.orgs.write().await.remove(client_id)
    }

    pub async fn len(&self) -> usize {
        self.orgs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orgs.read().await.is_empty()
    }
}
