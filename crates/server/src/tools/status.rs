//! cache_status tool implementation.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use offcache_core::{CacheManager, WorkerState};

use super::json_result;

/// Parameters for the cache_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusParams {
    /// List the stored requests, oldest first.
    #[serde(default)]
    pub include_keys: bool,
}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub state: WorkerState,
    pub version: String,
    pub store: String,
    /// Every store present in storage, current one included.
    pub stores: Vec<String>,
    pub entry_count: usize,
    pub max_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(manager: &CacheManager, params: CacheStatusParams) -> Result<CallToolResult, McpError> {
    let stores = manager.storage().store_names().await?;
    let entry_count = manager.entry_count().await?;

    let keys = if params.include_keys {
        Some(manager.keys().await?.iter().map(ToString::to_string).collect())
    } else {
        None
    };

    let output = CacheStatusOutput {
        state: manager.state().await,
        version: manager.policy().version.clone(),
        store: manager.store_name().to_string(),
        stores,
        entry_count,
        max_items: manager.policy().max_items,
        keys,
    };

    json_result(&output)
}
