//! Expiry metadata attached to stored responses.
//!
//! The manager never parses header strings itself; it goes through a
//! [`MetadataCodec`]. The default [`HeaderCodec`] keeps the metadata inside
//! the stored response as two synthetic headers, so any backend that can hold
//! a response can hold its expiry too.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::HttpResponse;

/// Header carrying the write time in milliseconds since the Unix epoch.
pub const STORED_AT_HEADER: &str = "x-offcache-stored-at";

/// Header carrying the time-to-live in milliseconds.
pub const TTL_HEADER: &str = "x-offcache-ttl-ms";

/// When an entry was written and how long it stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryMetadata {
    /// Milliseconds since the Unix epoch.
    pub stored_at: i64,
    pub ttl: Duration,
}

impl CacheEntryMetadata {
    pub fn new(stored_at: i64, ttl: Duration) -> Self {
        Self { stored_at, ttl }
    }

    /// Expired once strictly more than `ttl` has elapsed since `stored_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        let age = now_ms.saturating_sub(self.stored_at);
        i128::from(age) > self.ttl.as_millis() as i128
    }

    /// Absolute expiry time in milliseconds since the epoch.
    pub fn expires_at(&self) -> i64 {
        self.stored_at
            .saturating_add(i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Encodes and decodes [`CacheEntryMetadata`] on a stored response.
pub trait MetadataCodec: Send + Sync {
    /// Stamp `meta` onto a response that is about to be stored.
    fn encode(&self, meta: &CacheEntryMetadata, response: &mut HttpResponse);

    /// Read metadata back. `None` when absent or malformed.
    fn decode(&self, response: &HttpResponse) -> Option<CacheEntryMetadata>;

    /// Remove any trace of the metadata before a response leaves the cache.
    fn strip(&self, response: &mut HttpResponse);
}

/// Stores metadata as the `x-offcache-*` headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderCodec;

impl MetadataCodec for HeaderCodec {
    fn encode(&self, meta: &CacheEntryMetadata, response: &mut HttpResponse) {
        response.set_header(STORED_AT_HEADER, meta.stored_at.to_string());
        response.set_header(TTL_HEADER, meta.ttl.as_millis().to_string());
    }

    fn decode(&self, response: &HttpResponse) -> Option<CacheEntryMetadata> {
        let stored_at = response.header(STORED_AT_HEADER)?.trim().parse::<i64>().ok()?;
        let ttl_ms = response.header(TTL_HEADER)?.trim().parse::<u64>().ok()?;
        Some(CacheEntryMetadata { stored_at, ttl: Duration::from_millis(ttl_ms) })
    }

    fn strip(&self, response: &mut HttpResponse) {
        response.remove_header(STORED_AT_HEADER);
        response.remove_header(TTL_HEADER);
    }
}
