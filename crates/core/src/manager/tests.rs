use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::cache::metadata::{STORED_AT_HEADER, TTL_HEADER};
use crate::cache::{CacheDb, MemoryStorage};
use crate::clock::ManualClock;

#[derive(Clone)]
enum Reply {
    Respond(HttpResponse),
    Fail,
    Hang,
    Slow(Duration, HttpResponse),
}

#[derive(Default)]
struct StubNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl StubNetwork {
    fn respond(&self, url: &str, response: HttpResponse) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Respond(response));
    }

    fn set(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &CacheRequest) -> Result<HttpResponse, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or(Reply::Fail);

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail => Err(Error::Network("connection refused".into())),
            Reply::Hang => std::future::pending().await,
            Reply::Slow(delay, response) => {
                tokio::time::sleep(delay).await;
                self.completed.lock().unwrap().push(request.url.clone());
                Ok(response)
            }
        }
    }
}

/// Storage whose writes always fail.
struct ReadOnlyStorage(MemoryStorage);

#[async_trait]
impl CacheStorage for ReadOnlyStorage {
    async fn open(&self, store: &str) -> Result<(), Error> {
        self.0.open(store).await
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.0.store_names().await
    }

    async fn delete_store(&self, store: &str) -> Result<bool, Error> {
        self.0.delete_store(store).await
    }

    async fn keys(&self, store: &str) -> Result<Vec<CacheRequest>, Error> {
        self.0.keys(store).await
    }

    async fn get(&self, store: &str, request: &CacheRequest) -> Result<Option<HttpResponse>, Error> {
        self.0.get(store, request).await
    }

    async fn put(&self, _store: &str, _request: &CacheRequest, _response: &HttpResponse) -> Result<(), Error> {
        Err(Error::Serialization("disk full".into()))
    }

    async fn delete(&self, store: &str, request: &CacheRequest) -> Result<bool, Error> {
        self.0.delete(store, request).await
    }
}

struct Harness {
    manager: Arc<CacheManager>,
    network: Arc<StubNetwork>,
    clock: Arc<ManualClock>,
    storage: Arc<MemoryStorage>,
}

fn ok(body: &str) -> HttpResponse {
    HttpResponse::new(200, body).with_header("content-type", "text/plain")
}

fn test_policy() -> CachePolicy {
    CachePolicy {
        precache: vec!["/".into(), "/offline.html".into()],
        fetch_timeout: Duration::from_millis(100),
        max_items: 10,
        ..Default::default()
    }
}

fn harness(policy: CachePolicy) -> Harness {
    let network = Arc::new(StubNetwork::default());
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(0));
    network.respond("/", ok("home"));
    network.respond("/offline.html", ok("offline page"));

    let manager = CacheManager::new(policy, storage.clone(), network.clone()).with_clock(clock.clone());
    Harness { manager: Arc::new(manager), network, clock, storage }
}

async fn activated(policy: CachePolicy) -> Harness {
    let h = harness(policy);
    h.manager.install().await.unwrap();
    h.manager.activate().await.unwrap();
    h
}

fn body_of(outcome: &FetchOutcome) -> (String, ResponseSource) {
    match outcome {
        FetchOutcome::Response { response, source } => (response.body_text(), *source),
        FetchOutcome::Passthrough => panic!("expected a response, got passthrough"),
    }
}

#[tokio::test]
async fn test_install_swallows_precache_failures() {
    let policy = CachePolicy {
        precache: vec!["/".into(), "/offline.html".into(), "/logo192.png".into()],
        ..test_policy()
    };
    let h = harness(policy);

    let report = h.manager.install().await.unwrap();

    assert_eq!(report.cached, vec!["/".to_string(), "/offline.html".to_string()]);
    assert_eq!(report.failed, vec!["/logo192.png".to_string()]);
    assert_eq!(h.manager.state().await, WorkerState::Installed);

    let store = h.manager.store_name();
    assert!(h.storage.get(store, &CacheRequest::get("/")).await.unwrap().is_some());
    assert!(h.storage.get(store, &CacheRequest::get("/offline.html")).await.unwrap().is_some());
    assert!(h.storage.get(store, &CacheRequest::get("/logo192.png")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_install_skips_non_200_precache() {
    let h = harness(test_policy());
    h.network.respond("/", HttpResponse::new(404, "gone"));

    let report = h.manager.install().await.unwrap();

    assert_eq!(report.failed, vec!["/".to_string()]);
    assert_eq!(h.manager.entry_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_activate_leaves_only_current_store() {
    let h = harness(test_policy());
    h.storage.open("offcache-v0").await.unwrap();
    h.storage
        .put("legacy", &CacheRequest::get("/"), &ok("old"))
        .await
        .unwrap();

    h.manager.install().await.unwrap();
    let report = h.manager.activate().await.unwrap();

    let mut deleted = report.deleted_stores.clone();
    deleted.sort();
    assert_eq!(deleted, vec!["legacy".to_string(), "offcache-v0".to_string()]);
    assert_eq!(h.storage.store_names().await.unwrap(), vec!["offcache-v1".to_string()]);
    assert_eq!(h.manager.state().await, WorkerState::Activated);
}

#[tokio::test]
async fn test_activate_creates_store_when_missing() {
    let h = harness(test_policy());
    h.manager.activate().await.unwrap();
    assert_eq!(h.storage.store_names().await.unwrap(), vec!["offcache-v1".to_string()]);
}

#[tokio::test]
async fn test_activate_notifies_clients() {
    let h = harness(test_policy());
    let mut page_a = h.manager.subscribe();
    let mut page_b = h.manager.subscribe();

    h.manager.install().await.unwrap();
    let report = h.manager.activate().await.unwrap();

    assert_eq!(report.notified_clients, 2);
    let expected = ClientNotice::ContentUpdated { version: "1".into() };
    assert_eq!(page_a.try_recv().unwrap(), expected);
    assert_eq!(page_b.try_recv().unwrap(), expected);
}

#[tokio::test]
async fn test_fetch_before_activation_passes_through() {
    let h = harness(test_policy());
    h.manager.install().await.unwrap();

    let outcome = h.manager.handle_fetch(&CacheRequest::get("/")).await;
    assert_eq!(outcome, FetchOutcome::Passthrough);
}

#[tokio::test]
async fn test_unlisted_type_passes_through_without_network() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/static/media/font.woff2");

    assert_eq!(h.manager.handle_fetch(&request).await, FetchOutcome::Passthrough);
    assert_eq!(h.network.calls_to("/static/media/font.woff2"), 0);
}

#[tokio::test]
async fn test_cache_first_hit_skips_network() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/static/css/main.css");
    h.manager
        .add_to_cache_with_expiration(&request, &ok("css v1"), Duration::from_millis(180_000))
        .await
        .unwrap();

    h.clock.set(100_000);
    let outcome = h.manager.handle_fetch(&request).await;

    assert_eq!(body_of(&outcome), ("css v1".to_string(), ResponseSource::Cache));
    assert_eq!(h.network.calls_to("/static/css/main.css"), 0);
}

#[tokio::test]
async fn test_cache_first_refetches_expired_entry() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/static/css/main.css");
    h.manager
        .add_to_cache_with_expiration(&request, &ok("css v1"), Duration::from_millis(180_000))
        .await
        .unwrap();
    h.network.respond("/static/css/main.css", ok("css v2"));

    h.clock.set(200_000);
    let outcome = h.manager.handle_fetch(&request).await;

    assert_eq!(body_of(&outcome), ("css v2".to_string(), ResponseSource::Network));
    assert_eq!(h.network.calls_to("/static/css/main.css"), 1);

    let entry = h.manager.lookup(&request).await.unwrap().unwrap();
    assert_eq!(entry.response.body_text(), "css v2");
    assert_eq!(entry.metadata.unwrap().stored_at, 200_000);
    assert!(!entry.expired);
}

#[tokio::test]
async fn test_ttl_boundary() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/logo512.png");
    h.clock.set(5_000);
    h.manager
        .add_to_cache_with_expiration(&request, &ok("png"), Duration::from_millis(1_000))
        .await
        .unwrap();
    h.network.respond("/logo512.png", ok("png fresh"));

    h.clock.set(5_000 + 1_000 - 1);
    assert_eq!(body_of(&h.manager.handle_fetch(&request).await).1, ResponseSource::Cache);

    h.clock.set(5_000 + 1_000 + 1);
    assert_eq!(body_of(&h.manager.handle_fetch(&request).await).1, ResponseSource::Network);
}

#[tokio::test]
async fn test_cache_hit_strips_metadata_headers() {
    let h = activated(test_policy()).await;
    let outcome = h.manager.handle_fetch(&CacheRequest::get("/")).await;

    let FetchOutcome::Response { response, source } = outcome else {
        panic!("expected a response");
    };
    assert_eq!(source, ResponseSource::Cache);
    assert!(response.header(STORED_AT_HEADER).is_none());
    assert!(response.header(TTL_HEADER).is_none());
    assert_eq!(response.content_type(), Some("text/plain"));
}

#[tokio::test]
async fn test_missing_metadata_counts_as_expired() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/index.html");
    h.storage
        .put(h.manager.store_name(), &request, &ok("unstamped"))
        .await
        .unwrap();
    h.network.respond("/index.html", ok("live"));

    assert!(h.manager.is_cache_expired(&ok("unstamped")));
    assert_eq!(body_of(&h.manager.handle_fetch(&request).await), ("live".to_string(), ResponseSource::Network));
}

#[tokio::test]
async fn test_network_first_prefers_network() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/api/sales/42");
    h.manager
        .add_to_cache_with_expiration(&request, &ok("cached sale"), Duration::from_millis(60_000))
        .await
        .unwrap();
    h.network.respond("/api/sales/42", ok("live sale"));

    let outcome = h.manager.handle_fetch(&request).await;

    assert_eq!(body_of(&outcome), ("live sale".to_string(), ResponseSource::Network));
    let entry = h.manager.lookup(&request).await.unwrap().unwrap();
    assert_eq!(entry.response.body_text(), "live sale");
    assert_eq!(entry.metadata.unwrap().ttl, h.manager.policy().dynamic_ttl);
}

#[tokio::test]
async fn test_absolute_dynamic_url_goes_to_network_first() {
    let h = activated(test_policy()).await;
    h.manager
        .add_to_cache_with_expiration(&CacheRequest::get("/api/sales/42"), &ok("cached sale"), Duration::from_millis(60_000))
        .await
        .unwrap();
    h.network.respond("/api/sales/42", ok("live sale"));

    let outcome = h.manager.handle_fetch(&CacheRequest::get("http://localhost:3000/api/sales/42")).await;

    assert_eq!(body_of(&outcome), ("live sale".to_string(), ResponseSource::Network));
    assert_eq!(h.network.calls_to("/api/sales/42"), 1);
    assert_eq!(h.manager.entry_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_network_first_timeout_falls_back_to_cache() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/api/sales/42");
    h.manager
        .add_to_cache_with_expiration(&request, &ok("cached sale"), Duration::from_millis(60_000))
        .await
        .unwrap();
    h.network.set("/api/sales/42", Reply::Hang);

    h.clock.set(30_000);
    let outcome = h.manager.handle_fetch(&request).await;

    assert_eq!(body_of(&outcome), ("cached sale".to_string(), ResponseSource::Cache));
}

#[tokio::test]
async fn test_network_first_timeout_without_cache_serves_offline_page() {
    let h = activated(test_policy()).await;
    h.network.set("/api/sales/42", Reply::Hang);

    let outcome = h.manager.handle_fetch(&CacheRequest::get("/api/sales/42")).await;

    assert_eq!(body_of(&outcome), ("offline page".to_string(), ResponseSource::Offline));
}

#[tokio::test]
async fn test_network_first_ignores_expired_cache() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/sales/7");
    h.manager
        .add_to_cache_with_expiration(&request, &ok("old sale"), Duration::from_millis(60_000))
        .await
        .unwrap();

    h.clock.set(60_001);
    let outcome = h.manager.handle_fetch(&request).await;

    assert_eq!(body_of(&outcome).1, ResponseSource::Offline);
}

#[tokio::test]
async fn test_cache_first_failure_serves_offline_page() {
    let h = activated(test_policy()).await;
    let outcome = h.manager.handle_fetch(&CacheRequest::get("/reports.html")).await;
    assert_eq!(body_of(&outcome), ("offline page".to_string(), ResponseSource::Offline));
}

#[tokio::test]
async fn test_offline_page_served_even_when_expired() {
    let h = activated(test_policy()).await;
    h.clock.set(10 * 180_000);
    let outcome = h.manager.handle_fetch(&CacheRequest::get("/reports.html")).await;
    assert_eq!(body_of(&outcome), ("offline page".to_string(), ResponseSource::Offline));
}

#[tokio::test]
async fn test_builtin_offline_page_when_not_precached() {
    let policy = CachePolicy { precache: Vec::new(), ..test_policy() };
    let h = activated(policy).await;

    let outcome = h.manager.handle_fetch(&CacheRequest::get("/reports.html")).await;

    let FetchOutcome::Response { response, source } = outcome else {
        panic!("expected a response");
    };
    assert_eq!(source, ResponseSource::Offline);
    assert_eq!(response.status, 503);
    assert!(response.body_text().contains("offline"));
}

#[tokio::test]
async fn test_non_200_is_returned_but_not_cached() {
    let h = activated(test_policy()).await;
    let request = CacheRequest::get("/missing.html");
    h.network.respond("/missing.html", HttpResponse::new(404, "not found"));

    let outcome = h.manager.handle_fetch(&request).await;

    let FetchOutcome::Response { response, source } = outcome else {
        panic!("expected a response");
    };
    assert_eq!((response.status, source), (404, ResponseSource::Network));
    assert!(h.manager.lookup(&request).await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_refuses_error_status() {
    let h = activated(test_policy()).await;
    let result = h
        .manager
        .add_to_cache_with_expiration(&CacheRequest::get("/x.js"), &HttpResponse::new(500, ""), Duration::ZERO)
        .await;
    assert!(matches!(result, Err(Error::NotCacheable(500))));
}

#[tokio::test]
async fn test_over_limit_write_evicts_single_oldest() {
    let policy = CachePolicy { precache: Vec::new(), max_items: 3, ..test_policy() };
    let h = activated(policy).await;

    for (t, url) in [(1, "/a.js"), (2, "/b.js"), (3, "/c.js")] {
        h.clock.set(t);
        h.manager
            .add_to_cache_with_expiration(&CacheRequest::get(url), &ok(url), Duration::from_secs(60))
            .await
            .unwrap();
    }
    assert_eq!(h.manager.entry_count().await.unwrap(), 3);

    h.clock.set(4);
    h.network.respond("/d.js", ok("d"));
    h.manager.handle_fetch(&CacheRequest::get("/d.js")).await;

    assert_eq!(h.manager.entry_count().await.unwrap(), 3);
    assert!(h.manager.lookup(&CacheRequest::get("/a.js")).await.unwrap().is_none());
    for url in ["/b.js", "/c.js", "/d.js"] {
        assert!(h.manager.lookup(&CacheRequest::get(url)).await.unwrap().is_some(), "{url}");
    }
}

#[tokio::test]
async fn test_eviction_ties_keep_write_order() {
    let policy = CachePolicy { precache: Vec::new(), max_items: 2, ..test_policy() };
    let h = activated(policy).await;

    h.clock.set(50);
    for url in ["/first.js", "/second.js", "/third.js"] {
        h.manager
            .add_to_cache_with_expiration(&CacheRequest::get(url), &ok(url), Duration::from_secs(60))
            .await
            .unwrap();
    }

    let keys: Vec<String> = h.manager.keys().await.unwrap().into_iter().map(|k| k.url).collect();
    assert_eq!(keys, vec!["/second.js".to_string(), "/third.js".to_string()]);
}

#[tokio::test]
async fn test_eviction_orders_by_timestamp_not_write_order() {
    let policy = CachePolicy { precache: Vec::new(), max_items: 100, ..test_policy() };
    let h = activated(policy).await;
    let codec = HeaderCodec;
    let store = h.manager.store_name().to_string();

    for (stored_at, url) in [(50, "/e.js"), (10, "/a.js"), (40, "/d.js"), (20, "/b.js"), (30, "/c.js")] {
        let mut response = ok(url);
        codec.encode(&CacheEntryMetadata::new(stored_at, Duration::from_secs(60)), &mut response);
        h.storage.put(&store, &CacheRequest::get(url), &response).await.unwrap();
    }
    h.storage
        .put(&store, &CacheRequest::get("/unstamped.js"), &ok("x"))
        .await
        .unwrap();

    let evicted = h.manager.evict_oldest(2).await.unwrap();

    assert_eq!(evicted, 4);
    let remaining: Vec<String> = h.manager.keys().await.unwrap().into_iter().map(|r| r.url).collect();
    assert_eq!(remaining, vec!["/e.js".to_string(), "/d.js".to_string()]);
}

#[tokio::test]
async fn test_enforce_limit_is_noop_under_cap() {
    let h = activated(test_policy()).await;
    assert_eq!(h.manager.enforce_cache_limit().await.unwrap(), 0);
    assert_eq!(h.manager.entry_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_purge_expired() {
    let h = activated(test_policy()).await;
    h.manager
        .add_to_cache_with_expiration(&CacheRequest::get("/api/x"), &ok("x"), Duration::from_millis(10))
        .await
        .unwrap();

    h.clock.set(11);
    assert_eq!(h.manager.purge_expired().await.unwrap(), 1);
    assert_eq!(h.manager.entry_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_fetch_with_timeout_does_not_cancel_fetch() {
    let h = harness(test_policy());
    h.network.set("/slow.js", Reply::Slow(Duration::from_millis(250), ok("late")));

    let result = h.manager.fetch_with_timeout(&CacheRequest::get("/slow.js")).await;
    assert!(matches!(result, Err(Error::FetchTimeout(_))));
    assert!(h.network.completed().is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.network.completed(), vec!["/slow.js".to_string()]);
}

#[tokio::test]
async fn test_cache_write_failure_still_returns_network_response() {
    let network = Arc::new(StubNetwork::default());
    network.respond("/api/sales", ok("list"));
    let storage = Arc::new(ReadOnlyStorage(MemoryStorage::new()));
    let manager = CacheManager::new(CachePolicy { precache: Vec::new(), ..test_policy() }, storage, network);
    manager.install().await.unwrap();
    manager.activate().await.unwrap();

    let outcome = manager.handle_fetch(&CacheRequest::get("/api/sales")).await;

    assert_eq!(body_of(&outcome), ("list".to_string(), ResponseSource::Network));
}

#[tokio::test]
async fn test_dynamic_route_message_warms_cache() {
    let h = activated(test_policy()).await;
    h.network.respond("/sales/42", ok("sale 42"));

    let outcome = h
        .manager
        .handle_message(WorkerMessage::CacheDynamicRoute { sale_id: "42".into() })
        .await
        .unwrap();

    assert_eq!(outcome, MessageOutcome::Warmed { url: "/sales/42".into() });
    let entry = h.manager.lookup(&CacheRequest::get("/sales/42")).await.unwrap().unwrap();
    assert_eq!(entry.metadata.unwrap().ttl, h.manager.policy().dynamic_ttl);
}

#[tokio::test]
async fn test_dynamic_route_message_failure_is_reported() {
    let h = activated(test_policy()).await;

    let outcome = h
        .manager
        .handle_message(WorkerMessage::CacheDynamicRoute { sale_id: "9".into() })
        .await
        .unwrap();

    assert!(matches!(outcome, MessageOutcome::WarmFailed { ref url, .. } if url == "/sales/9"));
}

#[tokio::test]
async fn test_dynamic_route_message_rejects_bad_id() {
    let h = activated(test_policy()).await;
    for id in ["", "  ", "../admin", "1?x=2"] {
        let result = h
            .manager
            .handle_message(WorkerMessage::CacheDynamicRoute { sale_id: id.into() })
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))), "{id:?}");
    }
}

#[tokio::test]
async fn test_skip_waiting_activates_installed_version() {
    let policy = CachePolicy { skip_waiting_on_install: false, ..test_policy() };
    let h = harness(policy);

    let (installed, activated) = bootstrap(h.manager.as_ref()).await.unwrap();
    assert!(!installed.skip_waiting);
    assert!(activated.is_none());
    assert_eq!(h.manager.state().await, WorkerState::Installed);

    let outcome = h.manager.handle_message(WorkerMessage::SkipWaiting).await.unwrap();
    assert!(matches!(outcome, MessageOutcome::Activated { .. }));
    assert_eq!(h.manager.state().await, WorkerState::Activated);

    let again = h.manager.handle_message(WorkerMessage::SkipWaiting).await.unwrap();
    assert_eq!(again, MessageOutcome::Ignored { state: WorkerState::Activated });
}

#[tokio::test]
async fn test_bootstrap_activates_immediately_by_default() {
    let h = harness(test_policy());
    let (installed, activated) = bootstrap(h.manager.as_ref()).await.unwrap();
    assert!(installed.skip_waiting);
    assert_eq!(activated.unwrap().store, "offcache-v1");
    assert_eq!(h.manager.state().await, WorkerState::Activated);
}

#[tokio::test]
async fn test_dispatch_routes_events() {
    let h = harness(test_policy());
    let manager = h.manager.as_ref();

    let installed = dispatch(manager, WorkerEvent::Install).await.unwrap();
    assert!(matches!(installed, EventOutcome::Installed(_)));

    let activated = dispatch(manager, WorkerEvent::Activate).await.unwrap();
    assert!(matches!(activated, EventOutcome::Activated(_)));

    let fetched = dispatch(manager, WorkerEvent::Fetch(CacheRequest::get("/"))).await.unwrap();
    let EventOutcome::Fetched(outcome) = fetched else {
        panic!("expected fetch outcome");
    };
    assert_eq!(body_of(&outcome), ("home".to_string(), ResponseSource::Cache));

    let handled = dispatch(manager, WorkerEvent::Message(WorkerMessage::SkipWaiting)).await.unwrap();
    assert!(matches!(handled, EventOutcome::Handled(MessageOutcome::Ignored { .. })));
}

#[tokio::test]
async fn test_version_rollover_with_sqlite_backend() {
    let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let network = Arc::new(StubNetwork::default());
    network.respond("/", ok("home v1"));
    network.respond("/offline.html", ok("offline"));

    let v1 = CacheManager::new(test_policy(), db.clone(), network.clone());
    bootstrap(&v1).await.unwrap();
    assert_eq!(v1.entry_count().await.unwrap(), 2);

    network.respond("/", ok("home v2"));
    let v2 = CacheManager::new(CachePolicy { version: "2".into(), ..test_policy() }, db.clone(), network.clone());
    let (_, activated) = bootstrap(&v2).await.unwrap();

    assert_eq!(activated.unwrap().deleted_stores, vec!["offcache-v1".to_string()]);
    assert_eq!(db.list_stores().await.unwrap(), vec!["offcache-v2".to_string()]);
    let outcome = v2.handle_fetch(&CacheRequest::get("/")).await;
    assert_eq!(body_of(&outcome), ("home v2".to_string(), ResponseSource::Cache));
}
