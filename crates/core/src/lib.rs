//! Core types and the offline cache manager for offcache.
//!
//! This crate provides:
//! - Named, versioned stores with SQLite and in-memory backends
//! - Expiry metadata and its header encoding
//! - The cache manager: install, activate, fetch routing, eviction, messages
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod manager;

pub use cache::{CacheDb, CacheStorage, MemoryStorage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, StorageKind};
pub use error::Error;
pub use http::{CacheRequest, HttpResponse};
pub use manager::{CacheManager, CachePolicy, FetchOutcome, Network, ResponseSource, WorkerMessage, WorkerState};
