//! Space Gateway - webhook intake for applications installed on JetBrains Space
//!
//! Verifies inbound webhooks against each organization's published RSA keys,
//! caches bearer tokens in a shared LRU + TTL memoizing cache, and tracks
//! revoked token ids.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{GatewayError, Result};
pub use tasks::spawn_cleanup_task;
