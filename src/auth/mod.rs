//! Auth Module
//!
//! Everything that establishes trust with the remote platform: the RPC client,
//! cached bearer tokens, webhook signature verification, token revocation and
//! the directory of installed organizations.

mod client;
mod jwk;
mod organizations;
mod revocation;
mod token;
mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{
    basic_credentials, public_keys_url, token_url, HttpPlatformClient, PlatformClient,
    TokenResponse,
};
pub use jwk::{parse_key_set, Jwk};
pub use organizations::OrganizationDirectory;
pub use revocation::{RevocationCache, REVOCATION_TTL, REVOKED_TOKEN_PREFIX};
pub use token::{BearerTokenProvider, BEARER_TOKEN_PREFIX, BEARER_TOKEN_TTL};
pub use verifier::{
    verifiable_data, verify_signature, DomainPolicy, OrgCredentials, WebhookRequest,
    WebhookVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
