//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Gateway and cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the volatile tier can hold
    pub max_memory_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Durable tier sweep interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the storefront REST backend
    pub backend_url: String,
    /// Bearer token sent to the backend, if any
    pub backend_token: Option<String>,
    /// Release identifier compared against durable entries
    pub cache_version: String,
    /// Directory holding the durable tier
    pub cache_dir: PathBuf,
    /// Namespace prepended to every durable key
    pub storage_prefix: String,
    /// Whether to warm the cache on startup
    pub preload: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY_ENTRIES` - Volatile tier capacity (default: 100)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Durable sweep frequency in seconds (default: 600)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `BACKEND_URL` - REST backend base URL (default: http://localhost:5000/api)
    /// - `BACKEND_TOKEN` - Bearer token for the backend (default: none)
    /// - `CACHE_VERSION` - Release identifier (default: crate version)
    /// - `CACHE_DIR` - Durable tier directory (default: platform cache dir)
    /// - `STORAGE_PREFIX` - Durable key namespace (default: storefront_cache_)
    /// - `PRELOAD` - Warm the cache on startup (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_entries: parse_var("MAX_MEMORY_ENTRIES")
                .unwrap_or(defaults.max_memory_entries),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            backend_url: env::var("BACKEND_URL").unwrap_or(defaults.backend_url),
            backend_token: env::var("BACKEND_TOKEN").ok().filter(|t| !t.is_empty()),
            cache_version: env::var("CACHE_VERSION").unwrap_or(defaults.cache_version),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            storage_prefix: env::var("STORAGE_PREFIX").unwrap_or(defaults.storage_prefix),
            preload: parse_var("PRELOAD").unwrap_or(defaults.preload),
        }
    }

    /// Directory holding the durable tier's record files.
    pub fn storage_path(&self) -> PathBuf {
        self.cache_dir.join("durable")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory_entries: 100,
            default_ttl: 300,
            cleanup_interval: 600,
            server_port: 3000,
            backend_url: "http://localhost:5000/api".to_string(),
            backend_token: None,
            cache_version: env!("CARGO_PKG_VERSION").to_string(),
            cache_dir: default_cache_dir(),
            storage_prefix: "storefront_cache_".to_string(),
            preload: true,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "storefront_cache")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| env::temp_dir().join("storefront_cache"))
}
