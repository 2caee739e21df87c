//! Resource read handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::ResourceKind;

use super::AppState;

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn stats(State(state): State<AppState>) -> Response {
    Json(state.store.stats()).into_response()
}

pub async fn list_cluster(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Response {
    let Some(kind) = cluster_kind(&kind) else {
        return not_found("unknown cluster-scoped kind");
    };
    Json(state.registry.list(state.store.as_ref(), kind, "")).into_response()
}

pub async fn count_cluster(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Response {
    let Some(kind) = cluster_kind(&kind) else {
        return not_found("unknown cluster-scoped kind");
    };
    let count = state.registry.count(state.store.as_ref(), kind, "");
    Json(json!({ "count": count })).into_response()
}

pub async fn get_cluster(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let Some(kind) = cluster_kind(&kind) else {
        return not_found("unknown cluster-scoped kind");
    };
    match state.registry.get(state.store.as_ref(), kind, "", &name) {
        Some(value) => Json(value).into_response(),
        None => not_found("resource not found"),
    }
}

pub async fn list_namespaced(
    State(state): State<AppState>,
    Path((namespace, kind)): Path<(String, String)>,
) -> Response {
    let Some(kind) = namespaced_kind(&kind) else {
        return not_found("unknown namespaced kind");
    };
    Json(state.registry.list(state.store.as_ref(), kind, &namespace)).into_response()
}

pub async fn count_namespaced(
    State(state): State<AppState>,
    Path((namespace, kind)): Path<(String, String)>,
) -> Response {
    let Some(kind) = namespaced_kind(&kind) else {
        return not_found("unknown namespaced kind");
    };
    let count = state.registry.count(state.store.as_ref(), kind, &namespace);
    Json(json!({ "count": count })).into_response()
}

pub async fn get_namespaced(
    State(state): State<AppState>,
    Path((namespace, kind, name)): Path<(String, String, String)>,
) -> Response {
    let Some(kind) = namespaced_kind(&kind) else {
        return not_found("unknown namespaced kind");
    };
    match state
        .registry
        .get(state.store.as_ref(), kind, &namespace, &name)
    {
        Some(value) => Json(value).into_response(),
        None => not_found("resource not found"),
    }
}

/// Kinds served under `/api/v1/cluster`; a namespaced kind has no
/// cluster-wide listing, so it is unknown here.
fn cluster_kind(raw: &str) -> Option<ResourceKind> {
    raw.parse::<ResourceKind>()
        .ok()
        .filter(|kind| !kind.is_namespaced())
}

fn namespaced_kind(raw: &str) -> Option<ResourceKind> {
    raw.parse::<ResourceKind>()
        .ok()
        .filter(|kind| kind.is_namespaced())
}

fn not_found(message: &'static str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}
