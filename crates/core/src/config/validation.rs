//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, StorageKind};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` or `store_prefix` is empty
    /// - `origin` is not an http(s) URL
    /// - `fetch_timeout_ms` is under 100ms or over 5 minutes
    /// - `max_items` is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - a path setting does not start with `/`
    /// - `dynamic_route_template` lacks the `{id}` placeholder
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if self.store_prefix.trim().is_empty() {
            return Err(invalid("store_prefix", "must not be empty"));
        }

        if !(self.origin.starts_with("http://") || self.origin.starts_with("https://")) {
            return Err(invalid("origin", "must be an http:// or https:// URL"));
        }

        if self.fetch_timeout_ms < 100 {
            return Err(invalid("fetch_timeout_ms", "must be at least 100ms"));
        }
        if self.fetch_timeout_ms > 300_000 {
            return Err(invalid("fetch_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_items == 0 {
            return Err(invalid("max_items", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.offline_page.starts_with('/') {
            return Err(invalid("offline_page", "must be an absolute path"));
        }
        if self.precache.iter().any(|p| !p.starts_with('/')) {
            return Err(invalid("precache", "every entry must be an absolute path"));
        }
        if self.dynamic_prefixes.iter().any(|p| !p.starts_with('/')) {
            return Err(invalid("dynamic_prefixes", "every prefix must start with '/'"));
        }

        if !self.dynamic_route_template.starts_with('/') || !self.dynamic_route_template.contains("{id}") {
            return Err(invalid("dynamic_route_template", "must be an absolute path containing {id}"));
        }

        if self.precache.len() > self.max_items {
            tracing::warn!(
                precache = self.precache.len(),
                max_items = self.max_items,
                "precache list exceeds max_items; oldest precached entries will be evicted"
            );
        }

        if !self.precache.contains(&self.offline_page) {
            tracing::warn!(offline_page = %self.offline_page, "offline page is not precached");
        }

        if self.storage == StorageKind::Memory {
            tracing::debug!("memory storage selected; stores will not survive a restart");
        }

        Ok(())
    }
}
