//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::manager::CachePolicy;
use crate::manager::policy::{DEFAULT_CACHEABLE_EXTENSIONS, DEFAULT_DYNAMIC_PREFIXES, DEFAULT_PRECACHE};

mod validation;

pub use validation::ConfigError;

/// Which backend holds the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Sqlite,
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployed application version. Changing it rolls every store over.
    ///
    /// Set via OFFCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix of the versioned store name (`{prefix}-v{version}`).
    #[serde(default = "default_store_prefix")]
    pub store_prefix: String,

    /// Upstream origin that request paths are resolved against.
    ///
    /// Set via OFFCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Storage backend.
    ///
    /// Set via OFFCACHE_STORAGE environment variable (`sqlite` or `memory`).
    #[serde(default = "default_storage")]
    pub storage: StorageKind,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to accept per upstream response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Time budget for every network fetch, in milliseconds.
    ///
    /// Set via OFFCACHE_FETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// TTL for cache-first (static) entries, in milliseconds.
    #[serde(default = "default_static_ttl_ms")]
    pub static_ttl_ms: u64,

    /// TTL for network-first (dynamic) entries, in milliseconds.
    #[serde(default = "default_dynamic_ttl_ms")]
    pub dynamic_ttl_ms: u64,

    /// Maximum number of entries in the store.
    ///
    /// Set via OFFCACHE_MAX_ITEMS environment variable.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Path prefixes served network-first.
    #[serde(default = "default_dynamic_prefixes")]
    pub dynamic_prefixes: Vec<String>,

    /// File extensions served cache-first.
    #[serde(default = "default_cacheable_extensions")]
    pub cacheable_extensions: Vec<String>,

    /// Paths fetched on install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Page served when both network and store fail.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Route warmed by CACHE_DYNAMIC_ROUTE; `{id}` is replaced by the sale id.
    #[serde(default = "default_dynamic_route_template")]
    pub dynamic_route_template: String,

    /// Activate right after install instead of waiting for SKIP_WAITING.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,
}

fn default_version() -> String {
    "1".into()
}

fn default_store_prefix() -> String {
    "offcache".into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_storage() -> StorageKind {
    StorageKind::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_static_ttl_ms() -> u64 {
    180_000
}

fn default_dynamic_ttl_ms() -> u64 {
    60_000
}

fn default_max_items() -> usize {
    50
}

fn default_dynamic_prefixes() -> Vec<String> {
    DEFAULT_DYNAMIC_PREFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_cacheable_extensions() -> Vec<String> {
    DEFAULT_CACHEABLE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_precache() -> Vec<String> {
    DEFAULT_PRECACHE.iter().map(|s| s.to_string()).collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_dynamic_route_template() -> String {
    "/sales/{id}".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            store_prefix: default_store_prefix(),
            origin: default_origin(),
            storage: default_storage(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            static_ttl_ms: default_static_ttl_ms(),
            dynamic_ttl_ms: default_dynamic_ttl_ms(),
            max_items: default_max_items(),
            dynamic_prefixes: default_dynamic_prefixes(),
            cacheable_extensions: default_cacheable_extensions(),
            precache: default_precache(),
            offline_page: default_offline_page(),
            dynamic_route_template: default_dynamic_route_template(),
            skip_waiting_on_install: true,
        }
    }
}

impl AppConfig {
    /// Fetch timeout as Duration for use with tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Derive the cache manager's policy.
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            store_prefix: self.store_prefix.clone(),
            version: self.version.clone(),
            precache: self.precache.clone(),
            offline_page: self.offline_page.clone(),
            max_items: self.max_items,
            fetch_timeout: self.fetch_timeout(),
            static_ttl: Duration::from_millis(self.static_ttl_ms),
            dynamic_ttl: Duration::from_millis(self.dynamic_ttl_ms),
            dynamic_prefixes: self.dynamic_prefixes.clone(),
            cacheable_extensions: self
                .cacheable_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            dynamic_route_template: self.dynamic_route_template.clone(),
            skip_waiting_on_install: self.skip_waiting_on_install,
        }
    }
}
