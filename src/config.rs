//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_MAX_ENTRIES;

/// Domain suffix every remote platform organization lives under.
pub const DEFAULT_DOMAIN_SUFFIX: &str = "jetbrains.space";

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the shared cache can hold
    pub max_entries: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Host suffix accepted for organization server URLs
    pub domain_suffix: String,
    /// Timeout in seconds for outbound calls to the remote platform
    pub http_timeout: u64,
    /// Accept plain `http://` server URLs (local testing only)
    pub allow_insecure: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `SPACE_DOMAIN_SUFFIX` - Accepted organization host suffix (default: jetbrains.space)
    /// - `HTTP_TIMEOUT` - Outbound request timeout in seconds (default: 30)
    /// - `ALLOW_INSECURE_SPACE` - Accept http:// organization URLs (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            domain_suffix: env::var("SPACE_DOMAIN_SUFFIX")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.domain_suffix),
            http_timeout: parse_var("HTTP_TIMEOUT").unwrap_or(defaults.http_timeout),
            allow_insecure: parse_var("ALLOW_INSECURE_SPACE").unwrap_or(defaults.allow_insecure),
        }
    }

    /// Outbound request timeout as a Duration.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            server_port: 3000,
            cleanup_interval: 60,
            domain_suffix: DEFAULT_DOMAIN_SUFFIX.to_string(),
            http_timeout: 30,
            allow_insecure: false,
        }
    }
}
