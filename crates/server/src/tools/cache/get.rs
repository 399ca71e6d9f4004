//! cache_get tool implementation.
//!
//! Reads one stored entry with its decoded expiry metadata, without applying
//! any routing strategy.

use chrono::{DateTime, Utc};
use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use offcache_core::{CacheManager, CacheRequest, Error};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Origin-relative URL of the stored request.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// RFC 3339 time the entry was written, if it carries metadata.
    pub stored_at: Option<String>,
    pub ttl_ms: Option<u64>,
    pub expires_at: Option<String>,
    /// Past its TTL, or written without metadata.
    pub expired: bool,
}

fn rfc3339(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.to_rfc3339())
}

/// Implementation of the cache_get tool.
pub async fn get_impl(manager: &CacheManager, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let request = CacheRequest::get(params.url.trim());
    let entry = manager
        .lookup(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url.clone()))?;

    let output = CacheGetOutput {
        url: request.url,
        status: entry.response.status,
        body: entry.response.body_text(),
        headers: entry.response.headers,
        stored_at: entry.metadata.and_then(|m| rfc3339(m.stored_at)),
        ttl_ms: entry.metadata.map(|m| m.ttl.as_millis() as u64),
        expires_at: entry.metadata.and_then(|m| rfc3339(m.expires_at())),
        expired: entry.expired,
    };

    json_result(&output)
}
