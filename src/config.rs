//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the query cache can hold
    pub max_entries: usize,
    /// Default cache TTL in milliseconds
    pub default_ttl_ms: u64,
    /// Cache TTL for gallery and project listings, in milliseconds
    pub listing_ttl_ms: u64,
    /// Cache TTL for tag and category metadata, in milliseconds
    pub metadata_ttl_ms: u64,
    /// Minimum interval between identical uncached queries, in milliseconds
    pub throttle_interval_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Base URL the profile sync client posts to
    pub sync_base_url: String,
    /// Quiet period before a profile edit is pushed, in milliseconds
    pub sync_debounce_ms: u64,
    /// Bearer tokens accepted by the static verifier, token -> uid
    pub auth_tokens: HashMap<String, String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 100)
    /// - `DEFAULT_TTL_MS` - Default cache TTL (default: 120000)
    /// - `LISTING_TTL_MS` - Listing TTL (default: 120000)
    /// - `METADATA_TTL_MS` - Tag/category TTL (default: 300000)
    /// - `THROTTLE_INTERVAL_MS` - Throttle window (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `SYNC_BASE_URL` - Profile sync endpoint base (default: http://127.0.0.1:3000)
    /// - `SYNC_DEBOUNCE_MS` - Profile sync debounce (default: 800)
    /// - `AUTH_TOKENS` - `token:uid` pairs separated by commas (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            listing_ttl_ms: parse_var("LISTING_TTL_MS").unwrap_or(defaults.listing_ttl_ms),
            metadata_ttl_ms: parse_var("METADATA_TTL_MS").unwrap_or(defaults.metadata_ttl_ms),
            throttle_interval_ms: parse_var("THROTTLE_INTERVAL_MS")
                .unwrap_or(defaults.throttle_interval_ms),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            sync_base_url: env::var("SYNC_BASE_URL").unwrap_or(defaults.sync_base_url),
            sync_debounce_ms: parse_var("SYNC_DEBOUNCE_MS").unwrap_or(defaults.sync_debounce_ms),
            auth_tokens: env::var("AUTH_TOKENS")
                .map(|raw| parse_auth_tokens(&raw))
                .unwrap_or_default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl_ms: 120_000,
            listing_ttl_ms: 120_000,
            metadata_ttl_ms: 300_000,
            throttle_interval_ms: 1_000,
            server_port: 3000,
            cleanup_interval: 60,
            sync_base_url: "http://127.0.0.1:3000".to_string(),
            sync_debounce_ms: 800,
            auth_tokens: HashMap::new(),
        }
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parses `token:uid,token:uid`. Malformed pairs are skipped.
pub fn parse_auth_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, uid) = pair.trim().split_once(':')?;
            let (token, uid) = (token.trim(), uid.trim());
            (!token.is_empty() && !uid.is_empty()).then(|| (token.to_string(), uid.to_string()))
        })
        .collect()
}
