//! Page cache storage.

use std::{
    future::Future,
    sync::RwLock,
    time::{Duration, Instant},
};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Rendered HTTP response as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Clone)]
struct CachedPage {
    response: CachedResponse,
    stored_at: Instant,
}

/// Bounded store of rendered pages with per-lookup TTL.
pub struct PageCache {
    pages: RwLock<LruCache<PageKey, CachedPage>>,
}

impl PageCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            pages: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Serve `key` from the cache while it is younger than `ttl`, otherwise
    /// call `render` and store what it produces.
    ///
    /// A render error is returned as-is and nothing is stored, which lets
    /// callers hand back responses that must not be cached.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        key: PageKey,
        ttl: Duration,
        render: F,
    ) -> Result<CachedResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedResponse, E>>,
    {
        if let Some(hit) = self.get_at(&key, ttl, Instant::now()) {
            counter!("yatube_page_cache_hit_total").increment(1);
            debug!(path = %key.path, outcome = "hit", "serving cached page");
            return Ok(hit);
        }

        counter!("yatube_page_cache_miss_total").increment(1);
        debug!(path = %key.path, outcome = "miss", "rendering page");

        let rendered = render().await?;
        self.insert_at(key, rendered.clone(), Instant::now());
        Ok(rendered)
    }

    pub fn get_at(&self, key: &PageKey, ttl: Duration, now: Instant) -> Option<CachedResponse> {
        let mut pages = rw_write(&self.pages, SOURCE, "get");
        let stored_at = pages.get(key)?.stored_at;

        if now.saturating_duration_since(stored_at) >= ttl {
            pages.pop(key);
            counter!("yatube_page_cache_expired_total").increment(1);
            return None;
        }

        pages.get(key).map(|page| page.response.clone())
    }

    pub fn insert_at(&self, key: PageKey, response: CachedResponse, now: Instant) {
        let page = CachedPage {
            response,
            stored_at: now,
        };
        let evicted = rw_write(&self.pages, SOURCE, "insert").push(key.clone(), page);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("yatube_page_cache_evict_total").increment(1);
        }
    }

    /// Drop every stored page; the next request for any key re-renders.
    pub fn invalidate(&self) {
        rw_write(&self.pages, SOURCE, "invalidate").clear();
        debug!("page cache invalidated");
    }

    pub fn len(&self) -> usize {
        rw_read(&self.pages, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
