//! Upstream HTTP fetch for the cache manager.
//!
//! ### Path Resolution
//! - Request URLs are origin-relative and joined onto the configured origin
//! - Absolute URLs must share the origin; fragments are removed
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Hard request timeout (the manager applies its own, shorter budget)
//!
//! Non-2xx statuses are returned as ordinary responses; only transport
//! failures are errors.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve};

use offcache_core::{CacheRequest, Error, HttpResponse, Network};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upstream origin (default: "http://localhost:3000")
    pub origin: String,

    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            user_agent: "offcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Build from application config.
    pub fn from_app(config: &offcache_core::AppConfig) -> Self {
        Self {
            origin: config.origin.clone(),
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            ..Default::default()
        }
    }
}

/// HTTP client that fetches request paths from a single origin.
pub struct FetchClient {
    http: Client,
    origin: ::url::Url,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, origin, config })
    }

    /// Fetch a request from the origin.
    ///
    /// Enforces the redirect and byte limits. Any status code is returned as a response.
    pub async fn get(&self, request: &CacheRequest) -> Result<HttpResponse, Error> {
        let start = Instant::now();
        let url = resolve(&self.origin, &request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", request.method)))?;

        let response = self
            .http
            .request(method, url.as_str())
            .send()
            .await
            .map_err(|e| map_send_error(&url, e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = collect_headers(response.headers());

        let bytes: Bytes = response.bytes().await.map_err(|e| map_send_error(&url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(HttpResponse { status: status.as_u16(), headers, body: bytes.to_vec() })
    }

    /// The canonical origin requests are resolved against.
    pub fn origin(&self) -> &::url::Url {
        &self.origin
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &CacheRequest) -> Result<HttpResponse, Error> {
        self.get(request).await
    }
}

fn map_send_error(url: &::url::Url, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(format!("{} timed out", url))
    } else {
        Error::Network(format!("{}: {}", url, e))
    }
}

fn collect_headers(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}
