//! Store inspection and maintenance tools.
//!
//! These act on the manager's current store without going through a
//! routing strategy.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
