use std::collections::HashSet;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    routing::get,
};
use metrics_util::debugging::DebuggingRecorder;
use tower::ServiceExt;
use yatube::cache::{CacheConfig, CacheState, page_cache_layer};

#[tokio::test]
async fn page_cache_emits_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let config = CacheConfig {
        enabled: true,
        ttl: Duration::from_secs(60),
        capacity: 1,
    };
    let cache_state = CacheState::new(config);

    let app = Router::new()
        .route("/", get(|| async { "feed" }))
        .route("/other", get(|| async { "other" }))
        .layer(middleware::from_fn_with_state(
            cache_state.clone(),
            page_cache_layer,
        ));

    // miss, hit, miss + eviction (capacity 1)
    for uri in ["/", "/", "/other"] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(cache_state.pages.len(), 1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        "yatube_page_cache_hit_total",
        "yatube_page_cache_miss_total",
        "yatube_page_cache_evict_total",
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
