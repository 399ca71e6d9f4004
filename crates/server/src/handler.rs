//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the cache manager.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::{CacheFetchParams, CacheMessageParams, CacheStatusParams, fetch_impl, message_impl, status_impl};

use offcache_core::CacheManager;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for offcache.
#[derive(Clone)]
pub struct OffcacheServer {
    manager: Arc<CacheManager>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffcacheServer {
    /// Create a new server handler around a bootstrapped manager.
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager, tool_router: Self::tool_router() }
    }

    /// Route a request through the cache manager.
    #[tool(
        description = "Fetch an origin-relative URL through the offline cache. GET requests for known asset types are served cache-first, API routes network-first with a timeout, and the offline page is the last resort. Reports the response source."
    )]
    async fn cache_fetch(&self, params: Parameters<CacheFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.manager, params.0).await
    }

    #[tool(
        description = "Send a message to the cache manager: {\"type\": \"CACHE_DYNAMIC_ROUTE\", \"saleId\": \"...\"} warms a sale page, {\"type\": \"SKIP_WAITING\"} activates an installed version."
    )]
    async fn cache_message(&self, params: Parameters<CacheMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.manager, params.0).await
    }

    #[tool(description = "Report lifecycle state, store name, entry count and optionally the stored request keys.")]
    async fn cache_status(&self, params: Parameters<CacheStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.manager, params.0).await
    }

    #[tool(description = "Read one stored entry with its stored-at time, TTL and expiry flag.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.manager, params.0).await
    }

    #[tool(description = "Purge expired entries and/or keep only the newest max_entries entries.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.manager, params.0).await
    }
}

impl ServerHandler for OffcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Offline cache for {} (version {}).",
                self.manager.store_name(),
                self.manager.policy().version
            )),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
