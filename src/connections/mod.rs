//! Connection cache module
//!
//! Keeps at most a fixed number of per-host [`crate::http::HostAgent`]s alive and evicts the least
//! recently used one when a new host pushes the cache over its bound.

mod cache;

pub use cache::{ConnectionCache, HostAffinity, DEFAULT_MAX_AGENTS};
