use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::gateway::AppState;
use crate::observability::RequestMetric;
use crate::pipeline::PrefetchReport;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub upstream: String,
    pub cache_entries: usize,
    pub in_flight: usize,
    pub recorded_requests: usize,
}

#[derive(Serialize)]
pub struct CacheCleared {
    pub removed: usize,
}

#[derive(Deserialize)]
pub struct PrefetchRequest {
    pub urls: Vec<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let pipeline = &state.pipeline;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        upstream: pipeline.config().upstream.base_url.clone(),
        cache_entries: pipeline.cache_stats().size,
        in_flight: pipeline.in_flight(),
        recorded_requests: pipeline.metrics().len(),
    })
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<Vec<RequestMetric>> {
    Json(state.pipeline.metrics())
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.pipeline.cache_stats())
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheCleared> {
    let removed = state.pipeline.cache_stats().size;
    state.pipeline.clear_cache();
    Json(CacheCleared { removed })
}

pub async fn prefetch(
    State(state): State<AppState>,
    Json(body): Json<PrefetchRequest>,
) -> Json<PrefetchReport> {
    Json(state.pipeline.prefetch(body.urls).await)
}
