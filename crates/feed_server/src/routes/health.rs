//! Health check and monitoring endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use feed_engine::{HubStats, InstrumentSnapshot, SchedulerState};
use serde::Serialize;

use super::AppState;

/// Health check response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" while the generation loop runs
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub scheduler: SchedulerState,
    pub instruments: usize,
    pub hub: HubStats,
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub ready: bool,
}

/// Build the health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/api/v1/instruments", get(instruments_handler))
}

/// GET /health
///
/// Reports 503 once the generation loop has stopped.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let scheduler = state.scheduler.state();
    let healthy = scheduler != SchedulerState::Stopped;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: crate::VERSION.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        scheduler,
        instruments: state.scheduler.instrument_count(),
        hub: state.service.hub().stats(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// GET /ready
///
/// Ready once the generation loop is running.
async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.scheduler.state() == SchedulerState::Running;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyResponse { ready }))
}

/// GET /api/v1/instruments - live state of every scheduled instrument
async fn instruments_handler(State(state): State<AppState>) -> Json<Vec<InstrumentSnapshot>> {
    Json(state.scheduler.snapshots())
}
