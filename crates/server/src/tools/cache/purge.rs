//! cache_purge tool implementation.
//!
//! Purges expired entries and/or trims the store to a count, oldest first.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use offcache_core::CacheManager;

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete every entry past its TTL.
    #[serde(default)]
    pub expired: bool,

    /// Keep only the newest N entries.
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Entries removed because they had expired.
    pub expired: usize,
    /// Entries removed to satisfy `max_entries`.
    pub evicted: usize,
    /// Entries left in the store.
    pub remaining: usize,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(manager: &CacheManager, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if !params.expired && params.max_entries.is_none() {
        return Err(ToolError::InvalidInput("At least one of expired or max_entries must be specified".to_string()).into());
    }

    let expired = if params.expired { manager.purge_expired().await? } else { 0 };
    let evicted = match params.max_entries {
        Some(max) => manager.evict_oldest(max).await?,
        None => 0,
    };

    let output = CachePurgeOutput { expired, evicted, remaining: manager.entry_count().await? };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{activated_fixture, output};
    use offcache_core::{CacheRequest, HttpResponse};
    use std::time::Duration;

    #[tokio::test]
    async fn test_purge_expired() {
        let fx = activated_fixture().await;
        fx.clock.advance(150_000);
        let fresh = HttpResponse::new(200, "{}");
        fx.manager
            .add_to_cache_with_expiration(&CacheRequest::get("/api/sales"), &fresh, Duration::from_millis(60_000))
            .await
            .unwrap();
        fx.clock.advance(50_000);

        let params = CachePurgeParams { expired: true, max_entries: None };
        let out: CachePurgeOutput = output(&purge_impl(&fx.manager, params).await.unwrap());

        assert_eq!(out.expired, 2);
        assert_eq!(out.evicted, 0);
        assert_eq!(out.remaining, 1);
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let fx = activated_fixture().await;

        let params = CachePurgeParams { expired: false, max_entries: Some(1) };
        let out: CachePurgeOutput = output(&purge_impl(&fx.manager, params).await.unwrap());

        assert_eq!(out.evicted, 1);
        assert_eq!(out.remaining, 1);
        assert!(fx.manager.lookup(&CacheRequest::get("/offline.html")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let fx = activated_fixture().await;

        let result = purge_impl(&fx.manager, CachePurgeParams::default()).await;
        assert!(result.is_err());
    }
}
