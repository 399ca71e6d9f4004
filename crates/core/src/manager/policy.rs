//! Cache policy: store naming, TTLs, size cap, and strategy selection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::CacheRequest;

/// How a request is routed between network and store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Try the network, fall back to the store, then the offline page.
    NetworkFirst,
    /// Serve from the store while fresh, otherwise go to the network.
    CacheFirst,
    /// Not intercepted.
    Passthrough,
}

/// Everything the manager needs to know about what to cache and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub store_prefix: String,
    pub version: String,
    /// Paths fetched and stored on install.
    pub precache: Vec<String>,
    pub offline_page: String,
    pub max_items: usize,
    pub fetch_timeout: Duration,
    pub static_ttl: Duration,
    pub dynamic_ttl: Duration,
    /// Path prefixes routed network-first.
    pub dynamic_prefixes: Vec<String>,
    /// Lowercase extensions, without the dot, routed cache-first.
    pub cacheable_extensions: Vec<String>,
    /// Route warmed by `CACHE_DYNAMIC_ROUTE`; `{id}` is replaced.
    pub dynamic_route_template: String,
    pub skip_waiting_on_install: bool,
}

pub const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/index.html",
    "/offline.html",
    "/favicon.ico",
    "/logo192.png",
    "/logo512.png",
    "/manifest.json",
    "/robots.txt",
    "/static/css/main.css",
    "/static/js/main.js",
];

pub const DEFAULT_DYNAMIC_PREFIXES: &[&str] = &["/api/", "/sales/"];

pub const DEFAULT_CACHEABLE_EXTENSIONS: &[&str] = &["html", "css", "js", "png", "jpg", "jpeg", "svg", "gif"];

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            store_prefix: "offcache".into(),
            version: "1".into(),
            precache: DEFAULT_PRECACHE.iter().map(|s| s.to_string()).collect(),
            offline_page: "/offline.html".into(),
            max_items: 50,
            fetch_timeout: Duration::from_millis(5_000),
            static_ttl: Duration::from_millis(180_000),
            dynamic_ttl: Duration::from_millis(60_000),
            dynamic_prefixes: DEFAULT_DYNAMIC_PREFIXES.iter().map(|s| s.to_string()).collect(),
            cacheable_extensions: DEFAULT_CACHEABLE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            dynamic_route_template: "/sales/{id}".into(),
            skip_waiting_on_install: true,
        }
    }
}

impl CachePolicy {
    /// Version-qualified store name, e.g. `offcache-v3`.
    pub fn store_name(&self) -> String {
        format!("{}-v{}", self.store_prefix, self.version)
    }

    pub fn is_dynamic(&self, request: &CacheRequest) -> bool {
        let path = request.path();
        self.dynamic_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Precached paths are always covered. Extension-less paths are document
    /// navigations and are covered like HTML.
    pub fn is_cacheable_type(&self, request: &CacheRequest) -> bool {
        let path = request.path();
        if self.precache.iter().any(|p| p == path) {
            return true;
        }
        match request.extension() {
            Some(ext) => self.cacheable_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)),
            None => true,
        }
    }

    /// Pick the strategy for a request. Only `GET` is ever intercepted.
    pub fn strategy_for(&self, request: &CacheRequest) -> Strategy {
        if !request.is_get() {
            return Strategy::Passthrough;
        }
        if self.is_dynamic(request) {
            return Strategy::NetworkFirst;
        }
        if self.is_cacheable_type(request) {
            return Strategy::CacheFirst;
        }
        Strategy::Passthrough
    }

    /// Concrete route for a `CACHE_DYNAMIC_ROUTE` id.
    pub fn dynamic_route(&self, id: &str) -> String {
        self.dynamic_route_template.replace("{id}", id)
    }
}
