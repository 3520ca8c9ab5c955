//! HTTP API: memory control surface, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use memwatch_lib::{
    health::{ComponentStatus, HealthRegistry},
    ControlResponse, MemorySnapshot, Monitor, MonitorConfig, MonitorConfigPatch, MonitorError,
    ReclamationStats,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitor: Monitor,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(monitor: Monitor, health_registry: HealthRegistry) -> Self {
        Self {
            monitor,
            health_registry,
        }
    }
}

/// Error rendered as `{success: false, message}`
pub enum ApiError {
    Monitor(MonitorError),
    /// Request body could not be read as JSON
    Body(JsonRejection),
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        Self::Monitor(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Monitor(e) => {
                let status = match &e {
                    MonitorError::ReclamationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                    MonitorError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
                    MonitorError::ReclamationFailed(_) | MonitorError::RuntimeUnavailable => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
            Self::Body(rejection) => (rejection.status(), rejection.body_text()),
        };
        (status, Json(ControlResponse::failure(message))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Return only the most recent `limit` snapshots
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GcStatsResponse {
    pub available: bool,
    #[serde(flatten)]
    pub stats: ReclamationStats,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.health_registry.sync_from_monitor(&state.monitor).await;
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn memory_usage(State(state): State<Arc<AppState>>) -> Json<MemorySnapshot> {
    Json(state.monitor.current_usage())
}

async fn memory_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.stats())
}

async fn memory_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<MemorySnapshot>> {
    let mut history = state.monitor.history();
    if let Some(limit) = query.limit {
        let skip = history.len().saturating_sub(limit);
        history.drain(..skip);
    }
    Json(history)
}

async fn gc_stats(State(state): State<Arc<AppState>>) -> Json<GcStatsResponse> {
    Json(GcStatsResponse {
        available: state.monitor.reclamation_available(),
        stats: state.monitor.gc_stats(),
    })
}

async fn force_gc(State(state): State<Arc<AppState>>) -> Result<Json<ControlResponse>, ApiError> {
    let response = state.monitor.force_reclaim()?;
    Ok(Json(response))
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<MonitorConfig> {
    Json(state.monitor.config())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    body: Result<Json<MonitorConfigPatch>, JsonRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    let Json(patch) = body?;
    let response = state.monitor.update_config(&patch)?;
    state.health_registry.sync_from_monitor(&state.monitor).await;
    Ok(Json(response))
}

async fn start_monitoring(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlResponse>, ApiError> {
    let outcome = state.monitor.start()?;
    state.health_registry.sync_from_monitor(&state.monitor).await;
    Ok(Json(outcome.into()))
}

async fn stop_monitoring(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let outcome = state.monitor.stop();
    state.health_registry.sync_from_monitor(&state.monitor).await;
    Json(outcome.into())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/memory/usage", get(memory_usage))
        .route("/memory/stats", get(memory_stats))
        .route("/memory/history", get(memory_history))
        .route("/memory/gc", get(gc_stats).post(force_gc))
        .route("/memory/config", get(get_config).put(update_config))
        .route("/memory/start", post(start_monitoring))
        .route("/memory/stop", post(stop_monitoring))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
