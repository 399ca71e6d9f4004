//! cache_fetch tool implementation.
//!
//! Routes one request through the manager the way an intercepted page fetch
//! would be handled, and reports where the response came from.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use offcache_core::{CacheManager, CacheRequest, Error, FetchOutcome, HttpResponse, ResponseSource};

use super::json_result;

/// Input parameters for cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Origin-relative URL, e.g. "/static/js/main.js".
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default)]
    pub method: Option<String>,
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Network,
    Cache,
    Offline,
    /// Not intercepted; fetched directly from the network.
    Passthrough,
}

impl From<ResponseSource> for FetchSource {
    fn from(source: ResponseSource) -> Self {
        match source {
            ResponseSource::Network => FetchSource::Network,
            ResponseSource::Cache => FetchSource::Cache,
            ResponseSource::Offline => FetchSource::Offline,
        }
    }
}

/// Output structure for cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchOutput {
    /// "METHOD url" of the handled request.
    pub request: String,
    pub source: FetchSource,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

impl CacheFetchOutput {
    fn new(request: &CacheRequest, source: FetchSource, response: HttpResponse) -> Self {
        Self {
            request: request.to_string(),
            source,
            status: response.status,
            content_type: response.content_type().map(str::to_string),
            body: response.body_text(),
            headers: response.headers,
        }
    }
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(manager: &CacheManager, params: CacheFetchParams) -> Result<CallToolResult, McpError> {
    let url = params.url.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = params.method.as_deref().map(str::trim).filter(|m| !m.is_empty()).unwrap_or("GET");
    let request = CacheRequest::new(method, url);

    let output = match manager.handle_fetch(&request).await {
        FetchOutcome::Response { response, source } => CacheFetchOutput::new(&request, source.into(), response),
        FetchOutcome::Passthrough => {
            tracing::debug!(request = %request, "not intercepted; fetching directly");
            let response = manager.network().fetch(&request).await?;
            CacheFetchOutput::new(&request, FetchSource::Passthrough, response)
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{activated_fixture, output};

    fn params(url: &str) -> CacheFetchParams {
        CacheFetchParams { url: url.to_string(), method: None }
    }

    #[tokio::test]
    async fn test_fetch_static_then_served_from_cache() {
        let fx = activated_fixture().await;

        let first: CacheFetchOutput = output(&fetch_impl(&fx.manager, params("/static/js/main.js")).await.unwrap());
        assert_eq!(first.source, FetchSource::Network);
        assert_eq!(first.body, "console.log(1)");

        fx.network.go_offline();
        let second: CacheFetchOutput = output(&fetch_impl(&fx.manager, params("/static/js/main.js")).await.unwrap());
        assert_eq!(second.source, FetchSource::Cache);
        assert_eq!(second.body, "console.log(1)");
        assert!(second.headers.iter().all(|(name, _)| !name.starts_with("x-offcache-")));
    }

    #[tokio::test]
    async fn test_fetch_dynamic_offline_without_cache_serves_offline_page() {
        let fx = activated_fixture().await;
        fx.network.go_offline();

        let out: CacheFetchOutput = output(&fetch_impl(&fx.manager, params("/api/sales")).await.unwrap());
        assert_eq!(out.source, FetchSource::Offline);
        assert_eq!(out.body, "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_fetch_non_get_is_passthrough() {
        let fx = activated_fixture().await;
        let params = CacheFetchParams { url: "/api/orders".into(), method: Some("post".into()) };

        let out: CacheFetchOutput = output(&fetch_impl(&fx.manager, params).await.unwrap());
        assert_eq!(out.source, FetchSource::Passthrough);
        assert_eq!(out.request, "POST /api/orders");
        assert_eq!(out.status, 404);
        assert_eq!(fx.manager.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_passthrough_surfaces_network_error() {
        let fx = activated_fixture().await;
        fx.network.go_offline();
        let params = CacheFetchParams { url: "/api/orders".into(), method: Some("DELETE".into()) };

        assert!(fetch_impl(&fx.manager, params).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let fx = activated_fixture().await;
        assert!(fetch_impl(&fx.manager, params("  ")).await.is_err());
    }
}
