//! The offline cache manager.
//!
//! One [`CacheManager`] owns one versioned store. It decides per request
//! whether to answer from the store or the network, keeps the store bounded,
//! and falls back to a static offline page when both fail.
//!
//! ### Lifecycle
//! - `install`: open the versioned store and precache essential paths (best effort).
//! - `activate`: delete every other store, claim clients, announce the new version.
//!
//! ### Routing
//! - Network-first for dynamic prefixes (`/api/`, `/sales/`), short TTL.
//! - Cache-first for static types and navigations, long TTL.
//! - Everything else passes through untouched.
//!
//! ### Bounds
//! - Every fetch races a fixed timeout; the losing fetch is not cancelled.
//! - After every write the oldest entries beyond `max_items` are evicted.

pub mod events;
pub mod network;
pub mod policy;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

pub use events::{ClientNotice, EventHandler, EventOutcome, WorkerEvent, WorkerMessage, bootstrap, dispatch};
pub use network::Network;
pub use policy::{CachePolicy, Strategy};

use crate::Error;
use crate::cache::{CacheEntryMetadata, CacheStorage, HeaderCodec, MetadataCodec};
use crate::clock::{Clock, SystemClock};
use crate::http::{CacheRequest, HttpResponse};

/// Capacity of the client notice channel.
const NOTICE_CAPACITY: usize = 16;

const OFFLINE_FALLBACK_HTML: &str = "<!DOCTYPE html><html><head><title>Offline</title></head>\
<body><h1>You are offline</h1><p>This page is not available without a connection.</p></body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the caller performs the request itself.
    Passthrough,
    Response { response: HttpResponse, source: ResponseSource },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub store: String,
    pub cached: Vec<String>,
    pub failed: Vec<String>,
    /// Eligible to activate without waiting for old clients.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub store: String,
    pub deleted_stores: Vec<String>,
    pub notified_clients: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    Warmed { url: String },
    WarmFailed { url: String, reason: String },
    Activated { report: ActivateReport },
    Ignored { state: WorkerState },
}

/// A stored entry as seen from outside the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Response with metadata stripped.
    pub response: HttpResponse,
    pub metadata: Option<CacheEntryMetadata>,
    pub expired: bool,
}

/// Offline cache manager for one deployed version.
///
/// Safe to share behind an `Arc`; every handler can run as its own task.
pub struct CacheManager {
    policy: CachePolicy,
    store: String,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clock: Arc<dyn Clock>,
    codec: Arc<dyn MetadataCodec>,
    state: RwLock<WorkerState>,
    notices: broadcast::Sender<ClientNotice>,
}

impl CacheManager {
    pub fn new(policy: CachePolicy, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            store: policy.store_name(),
            policy,
            storage,
            network,
            clock: Arc::new(SystemClock),
            codec: Arc::new(HeaderCodec),
            state: RwLock::new(WorkerState::Parsed),
            notices,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn MetadataCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn store_name(&self) -> &str {
        &self.store
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    /// Register an open client page. It receives a notice on every activation.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientNotice> {
        self.notices.subscribe()
    }

    /// Open the versioned store and precache the essential paths.
    ///
    /// Individual precache failures are logged and reported, never fatal.
    /// Only failing to open the store aborts the install.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.set_state(WorkerState::Installing).await;

        if let Err(e) = self.storage.open(&self.store).await {
            self.set_state(WorkerState::Redundant).await;
            return Err(e);
        }

        let mut cached = Vec::new();
        let mut failed = Vec::new();
        for path in &self.policy.precache {
            let request = CacheRequest::get(path.clone());
            match self.precache_one(&request).await {
                Ok(()) => cached.push(path.clone()),
                Err(e) => {
                    warn!(path = %path, error = %e, "precache failed");
                    failed.push(path.clone());
                }
            }
        }

        self.set_state(WorkerState::Installed).await;
        info!(store = %self.store, cached = cached.len(), failed = failed.len(), "installed");

        Ok(InstallReport {
            store: self.store.clone(),
            cached,
            failed,
            skip_waiting: self.policy.skip_waiting_on_install,
        })
    }

    async fn precache_one(&self, request: &CacheRequest) -> Result<(), Error> {
        let response = self.fetch_with_timeout(request).await?;
        if !response.is_ok() {
            return Err(Error::NotCacheable(response.status));
        }
        self.add_to_cache_with_expiration(request, &response, self.policy.static_ttl)
            .await
    }

    /// Delete every store but the current one and take control of clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = self.state().await;
        self.set_state(WorkerState::Activating).await;

        let deleted_stores = match self.rollover().await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(previous).await;
                return Err(e);
            }
        };

        self.set_state(WorkerState::Activated).await;

        // No receivers means no pages to notify.
        let notified_clients = self
            .notices
            .send(ClientNotice::ContentUpdated { version: self.policy.version.clone() })
            .unwrap_or(0);

        info!(
            store = %self.store,
            deleted = deleted_stores.len(),
            clients = notified_clients,
            "activated"
        );

        Ok(ActivateReport { store: self.store.clone(), deleted_stores, notified_clients })
    }

    async fn rollover(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.storage.store_names().await? {
            if name == self.store {
                continue;
            }
            if self.storage.delete_store(&name).await? {
                info!(store = %name, "deleted stale store");
                deleted.push(name);
            }
        }
        self.storage.open(&self.store).await?;
        Ok(deleted)
    }

    /// Answer a page request.
    ///
    /// Covered requests always resolve to a live, cached, or offline response.
    /// Requests are only intercepted once this version is activated.
    pub async fn handle_fetch(&self, request: &CacheRequest) -> FetchOutcome {
        if self.state().await != WorkerState::Activated {
            return FetchOutcome::Passthrough;
        }

        match self.policy.strategy_for(request) {
            Strategy::Passthrough => FetchOutcome::Passthrough,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
        }
    }

    async fn network_first(&self, request: &CacheRequest) -> FetchOutcome {
        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_quietly(request, &response, self.policy.dynamic_ttl)
                        .await;
                }
                return FetchOutcome::Response { response, source: ResponseSource::Network };
            }
            Err(e) => log_fetch_failure(request, &e, "trying cache"),
        }

        if let Some(response) = self.fresh_cached(request).await {
            return FetchOutcome::Response { response, source: ResponseSource::Cache };
        }

        self.offline_outcome().await
    }

    async fn cache_first(&self, request: &CacheRequest) -> FetchOutcome {
        if let Some(response) = self.fresh_cached(request).await {
            debug!(request = %request, "cache hit");
            return FetchOutcome::Response { response, source: ResponseSource::Cache };
        }

        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_quietly(request, &response, self.policy.static_ttl)
                        .await;
                }
                FetchOutcome::Response { response, source: ResponseSource::Network }
            }
            Err(e) => {
                log_fetch_failure(request, &e, "serving offline page");
                self.offline_outcome().await
            }
        }
    }

    /// Run the network fetch as its own task and stop waiting after the timeout.
    ///
    /// The spawned fetch is left to finish on its own when the timer wins.
    pub async fn fetch_with_timeout(&self, request: &CacheRequest) -> Result<HttpResponse, Error> {
        let network = Arc::clone(&self.network);
        let owned = request.clone();
        let task = tokio::spawn(async move { network.fetch(&owned).await });

        match tokio::time::timeout(self.policy.fetch_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(Error::Network(format!("fetch task failed: {join_err}"))),
            Err(_) => Err(Error::FetchTimeout(format!(
                "{} after {}ms",
                request,
                self.policy.fetch_timeout.as_millis()
            ))),
        }
    }

    /// Stamp a copy of `response` with now + `ttl`, store it, then enforce the size cap.
    ///
    /// Non-2xx responses are refused with `Error::NotCacheable`.
    pub async fn add_to_cache_with_expiration(
        &self, request: &CacheRequest, response: &HttpResponse, ttl: Duration,
    ) -> Result<(), Error> {
        if !response.is_success() {
            return Err(Error::NotCacheable(response.status));
        }

        let mut stored = response.clone();
        let meta = CacheEntryMetadata::new(self.clock.now_ms(), ttl);
        self.codec.encode(&meta, &mut stored);

        self.storage.put(&self.store, request, &stored).await?;
        debug!(request = %request, ttl_ms = ttl.as_millis() as u64, "cached");

        self.enforce_cache_limit().await?;
        Ok(())
    }

    async fn store_quietly(&self, request: &CacheRequest, response: &HttpResponse, ttl: Duration) {
        if let Err(e) = self.add_to_cache_with_expiration(request, response, ttl).await {
            warn!(request = %request, error = %e, "cache write failed");
        }
    }

    /// Evict the oldest entries beyond `max_items`. Returns how many were evicted.
    pub async fn enforce_cache_limit(&self) -> Result<usize, Error> {
        self.evict_oldest(self.policy.max_items).await
    }

    /// Evict oldest-by-timestamp entries until at most `max` remain.
    ///
    /// Entries without readable metadata count as the oldest. Ties keep
    /// store order. Works on a point-in-time snapshot of the keys.
    pub async fn evict_oldest(&self, max: usize) -> Result<usize, Error> {
        let keys = self.storage.keys(&self.store).await?;
        if keys.len() <= max {
            return Ok(0);
        }

        let mut stamped = Vec::with_capacity(keys.len());
        for (position, key) in keys.into_iter().enumerate() {
            let Some(response) = self.storage.get(&self.store, &key).await? else {
                continue;
            };
            let stored_at = self
                .codec
                .decode(&response)
                .map(|m| m.stored_at)
                .unwrap_or(i64::MIN);
            stamped.push((stored_at, position, key));
        }

        stamped.sort_by_key(|(stored_at, position, _)| (*stored_at, *position));
        let excess = stamped.len().saturating_sub(max);

        let mut evicted = 0;
        for (_, _, key) in stamped.into_iter().take(excess) {
            if self.storage.delete(&self.store, &key).await? {
                debug!(request = %key, "evicted");
                evicted += 1;
            }
        }

        Ok(evicted)
    }

    /// Delete every expired entry. Returns how many were deleted.
    pub async fn purge_expired(&self) -> Result<usize, Error> {
        let mut purged = 0;
        for key in self.storage.keys(&self.store).await? {
            let Some(response) = self.storage.get(&self.store, &key).await? else {
                continue;
            };
            if self.is_cache_expired(&response) && self.storage.delete(&self.store, &key).await? {
                purged += 1;
            }
        }
        Ok(purged)
    }

    /// True when the stored response is past its TTL or carries no metadata.
    pub fn is_cache_expired(&self, cached: &HttpResponse) -> bool {
        match self.codec.decode(cached) {
            Some(meta) => meta.is_expired_at(self.clock.now_ms()),
            None => true,
        }
    }

    /// Look up an entry without applying any strategy.
    pub async fn lookup(&self, request: &CacheRequest) -> Result<Option<CachedEntry>, Error> {
        let Some(mut response) = self.storage.get(&self.store, request).await? else {
            return Ok(None);
        };
        let metadata = self.codec.decode(&response);
        let expired = self.is_cache_expired(&response);
        self.codec.strip(&mut response);
        Ok(Some(CachedEntry { response, metadata, expired }))
    }

    pub async fn entry_count(&self) -> Result<usize, Error> {
        self.storage.len(&self.store).await
    }

    pub async fn keys(&self) -> Result<Vec<CacheRequest>, Error> {
        self.storage.keys(&self.store).await
    }

    async fn fresh_cached(&self, request: &CacheRequest) -> Option<HttpResponse> {
        let mut response = match self.storage.get(&self.store, request).await {
            Ok(Some(response)) => response,
            Ok(None) => return None,
            Err(e) => {
                warn!(request = %request, error = %e, "cache read failed");
                return None;
            }
        };

        if self.is_cache_expired(&response) {
            debug!(request = %request, "cache entry expired");
            return None;
        }

        self.codec.strip(&mut response);
        Some(response)
    }

    /// The stored offline page regardless of age, or a built-in page.
    pub async fn offline_response(&self) -> HttpResponse {
        let request = CacheRequest::get(self.policy.offline_page.clone());
        match self.storage.get(&self.store, &request).await {
            Ok(Some(mut response)) => {
                self.codec.strip(&mut response);
                response
            }
            Ok(None) => builtin_offline_page(),
            Err(e) => {
                warn!(error = %e, "offline page read failed");
                builtin_offline_page()
            }
        }
    }

    async fn offline_outcome(&self) -> FetchOutcome {
        FetchOutcome::Response { response: self.offline_response().await, source: ResponseSource::Offline }
    }

    /// Handle an out-of-band command from the application.
    pub async fn handle_message(&self, message: WorkerMessage) -> Result<MessageOutcome, Error> {
        match message {
            WorkerMessage::CacheDynamicRoute { sale_id } => self.warm_dynamic_route(&sale_id).await,
            WorkerMessage::SkipWaiting => {
                let state = self.state().await;
                if state != WorkerState::Installed {
                    debug!(state = %state, "SKIP_WAITING ignored");
                    return Ok(MessageOutcome::Ignored { state });
                }
                let report = self.activate().await?;
                Ok(MessageOutcome::Activated { report })
            }
        }
    }

    async fn warm_dynamic_route(&self, sale_id: &str) -> Result<MessageOutcome, Error> {
        let sale_id = sale_id.trim();
        if sale_id.is_empty() || sale_id.contains(['/', '?', '#']) {
            return Err(Error::InvalidInput(format!("invalid saleId: {sale_id:?}")));
        }

        let url = self.policy.dynamic_route(sale_id);
        let request = CacheRequest::get(url.clone());

        let result = match self.fetch_with_timeout(&request).await {
            Ok(response) if response.is_ok() => {
                self.add_to_cache_with_expiration(&request, &response, self.policy.dynamic_ttl)
                    .await
            }
            Ok(response) => Err(Error::NotCacheable(response.status)),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(url = %url, "warmed dynamic route");
                Ok(MessageOutcome::Warmed { url })
            }
            Err(e) => {
                warn!(url = %url, error = %e, "dynamic route warm failed");
                Ok(MessageOutcome::WarmFailed { url, reason: e.to_string() })
            }
        }
    }
}

/// Upstream outages are expected offline; anything else points at a bad request or setup.
fn log_fetch_failure(request: &CacheRequest, error: &Error, fallback: &str) {
    if error.is_network_failure() {
        debug!(request = %request, error = %error, fallback, "network failed");
    } else {
        warn!(request = %request, error = %error, fallback, "fetch failed");
    }
}

fn builtin_offline_page() -> HttpResponse {
    HttpResponse::new(503, OFFLINE_FALLBACK_HTML).with_header("content-type", "text/html; charset=utf-8")
}
