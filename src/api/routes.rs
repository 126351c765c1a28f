use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::config::DEFAULT_WINDOW_SECS;
use crate::db::{SamplePoint, SampleStore};
use crate::error::AppError;
use crate::probe::{probe_all, TargetStatus};
use crate::query::{now_secs, uptime_percentage, window_to_since};
use crate::registry::{Registry, Target};

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn SampleStore>,
    pub health: Arc<HealthState>,
    pub probe_timeout: Duration,
    pub max_workers: usize,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/api/status", get(get_status))
        .route("/api/targets", get(get_targets))
        .route("/api/targets/:host/:port", get(get_target_detail))
        .route("/api/uptime", get(get_uptime))
        .route("/api/series", get(get_series))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UptimeQuery {
    pub host: String,
    pub port: u16,
    /// Window length in seconds; defaults to 24h.
    pub window_secs: Option<i64>,
}

#[derive(Deserialize)]
pub struct SeriesQuery {
    pub host: String,
    pub port: u16,
    /// Window spec like "2h" or "7d"; malformed specs degrade to 24h.
    pub window: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TargetDetailResponse {
    pub id: u32,
    pub user: String,
    pub host: String,
    pub port: u16,
    /// Uptime percentages; null means no samples in that window.
    pub uptime_1h: Option<f64>,
    pub uptime_24h: Option<f64>,
    pub uptime_7d: Option<f64>,
}

#[derive(Serialize)]
pub struct UptimeResponse {
    pub host: String,
    pub port: u16,
    pub window_secs: i64,
    pub uptime: Option<f64>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub targets: usize,
    pub passes_completed: u64,
    pub samples_persisted: u64,
    pub last_sample_ts: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// On-demand probe pass over the whole registry. Independent of the sampler's
/// cadence and never persisted.
async fn get_status(State(state): State<ApiState>) -> Json<Vec<TargetStatus>> {
    let statuses = probe_all(
        state.registry.targets(),
        state.probe_timeout,
        state.max_workers,
    )
    .await;
    Json(statuses)
}

async fn get_targets(State(state): State<ApiState>) -> Json<Vec<Target>> {
    Json(state.registry.targets().to_vec())
}

async fn get_target_detail(
    State(state): State<ApiState>,
    Path((host, port)): Path<(String, u16)>,
) -> Result<Json<TargetDetailResponse>, AppError> {
    let target = state
        .registry
        .find(&host, port)
        .ok_or_else(|| AppError::NotFound(format!("no target {host}:{port}")))?
        .clone();

    let now = now_secs();
    let day = 24 * 3600;
    let uptime_1h = uptime_percentage(state.store.as_ref(), &host, port, now - 3600).await?;
    let uptime_24h = uptime_percentage(state.store.as_ref(), &host, port, now - day).await?;
    let uptime_7d = uptime_percentage(state.store.as_ref(), &host, port, now - 7 * day).await?;

    Ok(Json(TargetDetailResponse {
        id: target.id,
        user: target.user,
        host,
        port,
        uptime_1h,
        uptime_24h,
        uptime_7d,
    }))
}

async fn get_uptime(
    State(state): State<ApiState>,
    Query(params): Query<UptimeQuery>,
) -> Result<Json<UptimeResponse>, AppError> {
    validate_endpoint(&params.host, params.port)?;

    let window_secs = params.window_secs.unwrap_or(DEFAULT_WINDOW_SECS);
    let since = now_secs() - window_secs;
    let uptime = uptime_percentage(state.store.as_ref(), &params.host, params.port, since).await?;

    Ok(Json(UptimeResponse {
        host: params.host,
        port: params.port,
        window_secs,
        uptime,
    }))
}

async fn get_series(
    State(state): State<ApiState>,
    Query(params): Query<SeriesQuery>,
) -> Result<Json<Vec<SamplePoint>>, AppError> {
    validate_endpoint(&params.host, params.port)?;

    let window = params.window.as_deref().unwrap_or("24h");
    let since = window_to_since(window, now_secs());
    let points = state.store.series(&params.host, params.port, since).await?;

    Ok(Json(points))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        targets: state.registry.len(),
        passes_completed: state.health.passes_completed(),
        samples_persisted: state.health.samples_persisted(),
        last_sample_ts: state.health.last_sample_ts(),
    })
}

fn validate_endpoint(host: &str, port: u16) -> Result<(), AppError> {
    if host.is_empty() {
        return Err(AppError::BadRequest("host must not be empty".to_string()));
    }
    if port == 0 {
        return Err(AppError::BadRequest("port must be positive".to_string()));
    }
    Ok(())
}
