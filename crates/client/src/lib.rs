//! Client code for offcache.
//!
//! This crate provides the upstream HTTP fetch used by the cache manager
//! as its network.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, resolve};
