//! HTTP surface: JSON read API plus the SSE live-event stream.
//!
//! Handlers are thin: identity parsing happens here, reads go through the
//! kind registry, and accessor semantics surface as 404 / empty list / zero.
//! Low-level errors never reach clients.

mod events;
mod resources;

use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::{Router, routing::get};

use crate::mirror::{EventBus, KindRegistry, MirrorStore};

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MirrorStore>,
    pub bus: Arc<EventBus>,
    pub registry: Arc<KindRegistry>,
    /// Queue depth for each live subscriber created by `/api/v1/events`.
    pub subscriber_queue_depth: NonZeroUsize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(resources::health))
        .route("/api/v1/stats", get(resources::stats))
        .route("/api/v1/events", get(events::stream_events))
        .route("/api/v1/cluster/{kind}", get(resources::list_cluster))
        .route(
            "/api/v1/cluster/{kind}/count",
            get(resources::count_cluster),
        )
        .route("/api/v1/cluster/{kind}/{name}", get(resources::get_cluster))
        .route(
            "/api/v1/namespaces/{namespace}/{kind}",
            get(resources::list_namespaced),
        )
        .route(
            "/api/v1/namespaces/{namespace}/{kind}/count",
            get(resources::count_namespaced),
        )
        .route(
            "/api/v1/namespaces/{namespace}/{kind}/{name}",
            get(resources::get_namespaced),
        )
        .with_state(state)
}
