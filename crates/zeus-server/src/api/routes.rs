//! REST API routes.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::ws;
use crate::state::{AppState, Viewer};
use zeus_core::{BatchSummary, CoverMode, MatchPolicy, RestrictedZone};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/v1/status", get(status))
        .route("/v1/zones", get(list_zones))
        .route("/v1/viewers", get(list_viewers))
        .route("/ws/flights", get(ws::ws_handler))
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "online", "system": "Zeus" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Serialize)]
struct LastBatchStatus {
    timestamp: f64,
    published_at: String,
    summary: BatchSummary,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    viewers: usize,
    zones: usize,
    cells: usize,
    resolution: u8,
    cover: CoverMode,
    match_policy: MatchPolicy,
    last_batch: Option<LastBatchStatus>,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let last_batch = state.latest().map(|latest| LastBatchStatus {
        timestamp: latest.timestamp,
        published_at: latest.published_at.to_rfc3339(),
        summary: latest.summary,
    });

    Json(StatusResponse {
        status: "online",
        viewers: state.viewer_count(),
        zones: state.indexed_zones(),
        cells: state.indexed_cells(),
        resolution: state.resolution(),
        cover: state.cover(),
        match_policy: state.match_policy(),
        last_batch,
    })
}

async fn list_zones(State(state): State<Arc<AppState>>) -> Json<Vec<RestrictedZone>> {
    Json(state.zones().to_vec())
}

async fn list_viewers(State(state): State<Arc<AppState>>) -> Json<Vec<Viewer>> {
    Json(state.viewers())
}
