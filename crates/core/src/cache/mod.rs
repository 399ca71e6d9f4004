//! Named, versioned stores of request/response pairs.
//!
//! This module provides the storage side of the offline cache:
//!
//! - A [`CacheStorage`] trait shaped like browser cache storage
//! - A persistent SQLite backend ([`CacheDb`]) with WAL mode and migrations
//! - An in-memory backend ([`MemoryStorage`])
//! - Expiry metadata and its header encoding

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod metadata;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStorage;
pub use metadata::{CacheEntryMetadata, HeaderCodec, MetadataCodec};
pub use storage::CacheStorage;
