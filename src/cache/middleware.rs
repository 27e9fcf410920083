//! Page cache middleware.
//!
//! Wraps the public feed routes. GET requests are answered from the
//! [`PageCache`] when a fresh entry exists for the same path, query string and
//! viewer; otherwise the handler runs and a `200 OK` response without cookies
//! is stored.

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{instrument, warn};

use crate::application::guard::Viewer;

use super::{CacheConfig, PageCache, keys::PageKey, store::CachedResponse};

const MAX_CACHED_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Shared cache state for middleware and handlers.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub pages: Arc<PageCache>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let pages = Arc::new(PageCache::new(&config));
        Self { config, pages }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let viewer = request
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.username().map(str::to_string));
    let key = PageKey::new(
        request.uri().path(),
        request.uri().query().unwrap_or(""),
        viewer.as_deref(),
    );

    let outcome = cache
        .pages
        .get_or_render(key, cache.config.ttl, move || async move {
            let response = next.run(request).await;
            if !is_cacheable(&response) {
                return Err(response);
            }

            let (parts, body) = response.into_parts();
            let bytes = match to_bytes(body, MAX_CACHED_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(error = %err, "failed to buffer response body for caching");
                    return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
                }
            };

            Ok(CachedResponse {
                status: parts.status.as_u16(),
                headers: parts
                    .headers
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
                    .collect(),
                body: bytes,
            })
        })
        .await;

    match outcome {
        Ok(cached) => build_response(cached),
        Err(passthrough) => passthrough,
    }
}

fn is_cacheable(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(SET_COOKIE)
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
