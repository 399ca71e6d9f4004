//! cache_message tool implementation.
//!
//! Delivers a page message (`CACHE_DYNAMIC_ROUTE`, `SKIP_WAITING`) to the manager.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use offcache_core::{CacheManager, WorkerMessage};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMessageParams {
    /// Message object, e.g. `{"type": "CACHE_DYNAMIC_ROUTE", "saleId": "42"}`
    /// or `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

/// Implementation of the cache_message tool.
pub async fn message_impl(manager: &CacheManager, params: CacheMessageParams) -> Result<CallToolResult, McpError> {
    let message: WorkerMessage =
        serde_json::from_value(params.message).map_err(|e| ToolError::InvalidMessage(e.to_string()))?;

    let outcome = manager.handle_message(message).await?;
    json_result(&outcome)
}
