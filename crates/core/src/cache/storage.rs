//! Storage abstraction over a collection of named stores.
//!
//! Shaped like a browser cache storage: stores are opened by name, hold
//! request/response pairs, and can be enumerated and deleted wholesale.

use async_trait::async_trait;

use super::connection::CacheDb;
use crate::Error;
use crate::http::{CacheRequest, HttpResponse};

/// Backend that holds named stores of request/response pairs.
///
/// Writes are per-key atomic; nothing stronger is promised across keys.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it is absent.
    async fn open(&self, store: &str) -> Result<(), Error>;

    /// Names of all existing stores.
    async fn store_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and its entries. Returns false if it did not exist.
    async fn delete_store(&self, store: &str) -> Result<bool, Error>;

    /// Requests currently held in a store.
    async fn keys(&self, store: &str) -> Result<Vec<CacheRequest>, Error>;

    async fn get(&self, store: &str, request: &CacheRequest) -> Result<Option<HttpResponse>, Error>;

    /// Insert or overwrite. Last write wins.
    async fn put(&self, store: &str, request: &CacheRequest, response: &HttpResponse) -> Result<(), Error>;

    async fn delete(&self, store: &str, request: &CacheRequest) -> Result<bool, Error>;

    async fn len(&self, store: &str) -> Result<usize, Error> {
        Ok(self.keys(store).await?.len())
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, store: &str) -> Result<(), Error> {
        self.open_store(store).await
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.list_stores().await
    }

    async fn delete_store(&self, store: &str) -> Result<bool, Error> {
        self.drop_store(store).await
    }

    async fn keys(&self, store: &str) -> Result<Vec<CacheRequest>, Error> {
        self.entry_keys(store).await
    }

    async fn get(&self, store: &str, request: &CacheRequest) -> Result<Option<HttpResponse>, Error> {
        self.get_entry(store, request).await
    }

    async fn put(&self, store: &str, request: &CacheRequest, response: &HttpResponse) -> Result<(), Error> {
        self.upsert_entry(store, request, response).await
    }

    async fn delete(&self, store: &str, request: &CacheRequest) -> Result<bool, Error> {
        self.delete_entry(store, request).await
    }

    async fn len(&self, store: &str) -> Result<usize, Error> {
        self.entry_count(store).await
    }
}
