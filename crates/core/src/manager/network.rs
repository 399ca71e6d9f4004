//! The upstream side of the cache.

use async_trait::async_trait;

use crate::Error;
use crate::http::{CacheRequest, HttpResponse};

/// Something that can perform a request against the real upstream.
///
/// Non-2xx statuses are ordinary responses, not errors. Errors are reserved
/// for transport failures (`Error::Network`, `Error::FetchTimeout`,
/// `Error::FetchTooLarge`).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &CacheRequest) -> Result<HttpResponse, Error>;
}
