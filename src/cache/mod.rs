//! Rendered page cache.
//!
//! Full HTML responses for the public feed are memoized per request identity
//! (path, query string and viewer) until the TTL elapses or the cache is
//! invalidated.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 20
//! capacity = 256
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::{PageKey, hash_query};
pub use middleware::{CacheState, page_cache_layer};
pub use store::{CachedResponse, PageCache};
