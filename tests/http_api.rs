//! Router-level tests for the JSON read API.

use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use floe::domain::ObjectMeta;
use floe::domain::resources::{Node, Pod, Resource};
use floe::infra::http::{AppState, build_router};
use floe::mirror::{EventBus, KindRegistry, LruMirrorStore, MirrorStore, resource_key};

fn seeded_router() -> Router {
    let store = Arc::new(LruMirrorStore::new(NonZeroUsize::new(64).unwrap()));

    put(
        store.as_ref(),
        Pod {
            metadata: ObjectMeta::namespaced("default", "web-2"),
            ..Pod::default()
        },
    );
    put(
        store.as_ref(),
        Pod {
            metadata: ObjectMeta::namespaced("default", "web-1"),
            ..Pod::default()
        },
    );
    put(
        store.as_ref(),
        Pod {
            metadata: ObjectMeta::namespaced("other", "web-9"),
            ..Pod::default()
        },
    );
    put(
        store.as_ref(),
        Node {
            metadata: ObjectMeta::cluster_scoped("node-a"),
            ..Node::default()
        },
    );

    let state = AppState {
        store,
        bus: Arc::new(EventBus::new()),
        registry: KindRegistry::with_defaults(),
        subscriber_queue_depth: NonZeroUsize::new(16).unwrap(),
    };
    build_router(state)
}

fn put<T: Resource>(store: &dyn MirrorStore, resource: T) {
    let key = resource_key(T::KIND, resource.namespace(), resource.name()).unwrap();
    store.set(&key, Bytes::from(serde_json::to_vec(&resource).unwrap()));
}

async fn send(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_returns_no_content() {
    let router = seeded_router();
    let (status, body) = send(&router, "/healthz").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn get_namespaced_resource() {
    let router = seeded_router();
    let (status, body) = send(&router, "/api/v1/namespaces/default/pod/web-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["name"], "web-1");
    assert_eq!(body["metadata"]["namespace"], "default");
}

#[tokio::test]
async fn missing_resource_is_404_with_error_body() {
    let router = seeded_router();
    let (status, body) = send(&router, "/api/v1/namespaces/default/pod/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "resource not found");
}

#[tokio::test]
async fn unknown_kind_is_404() {
    let router = seeded_router();
    let (status, _) = send(&router, "/api/v1/namespaces/default/gizmo/web-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn namespaced_kind_has_no_cluster_route() {
    let router = seeded_router();
    let (status, body) = send(&router, "/api/v1/cluster/pod").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown cluster-scoped kind");
}

#[tokio::test]
async fn cluster_kind_has_no_namespaced_route() {
    let router = seeded_router();
    let (status, _) = send(&router, "/api/v1/namespaces/default/node").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_is_namespace_restricted_and_name_sorted() {
    let router = seeded_router();
    let (status, body) = send(&router, "/api/v1/namespaces/default/pod").await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|pod| pod["metadata"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["web-1", "web-2"]);
}

#[tokio::test]
async fn empty_namespace_lists_as_empty_array() {
    let router = seeded_router();
    let (status, body) = send(&router, "/api/v1/namespaces/empty/pod").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn count_endpoints_report_per_scope_totals() {
    let router = seeded_router();

    let (status, body) = send(&router, "/api/v1/namespaces/default/pod/count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = send(&router, "/api/v1/cluster/node/count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (_, body) = send(&router, "/api/v1/namespaces/empty/pod/count").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn get_cluster_scoped_resource() {
    let router = seeded_router();
    let (status, body) = send(&router, "/api/v1/cluster/node/node-a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["name"], "node-a");
}

#[tokio::test]
async fn stats_expose_store_counters() {
    let router = seeded_router();

    // A hit and a miss first, so the counters have something to show.
    send(&router, "/api/v1/namespaces/default/pod/web-1").await;
    send(&router, "/api/v1/namespaces/default/pod/ghost").await;

    let (status, body) = send(&router, "/api/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"], 1);
    assert_eq!(body["misses"], 1);
    assert_eq!(body["evictions"], 0);
}
