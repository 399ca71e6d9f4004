//! In-memory storage backend.
//!
//! Uses nested maps behind a tokio RwLock. Nothing survives a restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::CacheStorage;
use crate::Error;
use crate::http::{CacheRequest, HttpResponse};

#[derive(Default)]
struct MemoryStore {
    /// Write sequence per key, so `keys()` reports write order.
    order: BTreeMap<String, u64>,
    entries: BTreeMap<String, (CacheRequest, HttpResponse)>,
}

#[derive(Default)]
struct Inner {
    seq: u64,
    stores: BTreeMap<String, MemoryStore>,
}

/// Store collection held entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, store: &str) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.stores.entry(store.to_string()).or_default();
        Ok(())
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.stores.keys().cloned().collect())
    }

    async fn delete_store(&self, store: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        Ok(inner.stores.remove(store).is_some())
    }

    async fn keys(&self, store: &str) -> Result<Vec<CacheRequest>, Error> {
        let inner = self.inner.read().await;
        let Some(s) = inner.stores.get(store) else {
            return Ok(Vec::new());
        };
        let mut keys: Vec<(u64, CacheRequest)> = s
            .entries
            .iter()
            .map(|(k, (req, _))| (s.order.get(k).copied().unwrap_or_default(), req.clone()))
            .collect();
        keys.sort_by_key(|(seq, _)| *seq);
        Ok(keys.into_iter().map(|(_, req)| req).collect())
    }

    async fn get(&self, store: &str, request: &CacheRequest) -> Result<Option<HttpResponse>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .stores
            .get(store)
            .and_then(|s| s.entries.get(&request.key()))
            .map(|(_, resp)| resp.clone()))
    }

    async fn put(&self, store: &str, request: &CacheRequest, response: &HttpResponse) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.seq += 1;
        let seq = inner.seq;
        let s = inner.stores.entry(store.to_string()).or_default();
        let key = request.key();
        s.order.insert(key.clone(), seq);
        s.entries.insert(key, (request.clone(), response.clone()));
        Ok(())
    }

    async fn delete(&self, store: &str, request: &CacheRequest) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        let Some(s) = inner.stores.get_mut(store) else {
            return Ok(false);
        };
        let key = request.key();
        s.order.remove(&key);
        Ok(s.entries.remove(&key).is_some())
    }

    async fn len(&self, store: &str) -> Result<usize, Error> {
        let inner = self.inner.read().await;
        Ok(inner.stores.get(store).map(|s| s.entries.len()).unwrap_or(0))
    }
}
