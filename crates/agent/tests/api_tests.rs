//! Integration tests for the agent API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use memwatch_agent::api::{create_router, AppState};
use memwatch_lib::{
    collector::MemorySource,
    health::{components, HealthRegistry},
    reclaim::{Reclaimer, UnavailableReclaimer},
    MemorySnapshot, Monitor, MonitorConfig, Result,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Heap whose used counter drops whenever `TrimReclaimer` runs
struct TestHeap {
    used: AtomicU64,
}

impl MemorySource for TestHeap {
    fn capture(&self) -> MemorySnapshot {
        MemorySnapshot::new(8192, 4096, self.used.load(Ordering::SeqCst), 128, 1_700_000_000_000)
    }
}

struct TrimReclaimer {
    heap: Arc<TestHeap>,
}

impl Reclaimer for TrimReclaimer {
    fn is_available(&self) -> bool {
        true
    }

    fn reclaim(&self) -> Result<()> {
        self.heap.used.fetch_sub(1024, Ordering::SeqCst);
        Ok(())
    }
}

async fn setup_test_app(reclaimer: Option<Arc<dyn Reclaimer>>) -> (Router, Arc<AppState>) {
    let heap = Arc::new(TestHeap {
        used: AtomicU64::new(2048),
    });
    let reclaimer =
        reclaimer.unwrap_or_else(|| Arc::new(TrimReclaimer { heap: heap.clone() }));

    let monitor = Monitor::builder()
        .config(MonitorConfig {
            auto_gc: false,
            ..Default::default()
        })
        .source(heap)
        .reclaimer(reclaimer)
        .build()
        .unwrap();

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let state = Arc::new(AppState::new(monitor, health_registry));
    let router = create_router(state.clone());

    (router, state)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz_degraded_while_idle() {
    let (app, _state) = setup_test_app(None).await;

    let (status, health) = send_json(app, "GET", "/healthz", None).await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"][components::SAMPLER]["status"], "degraded");
    assert_eq!(health["components"][components::RECLAIMER]["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_healthy_while_running() {
    let (app, state) = setup_test_app(None).await;
    state.monitor.start().unwrap();

    let (status, health) = send_json(app, "GET", "/healthz", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    state.monitor.stop();
}

#[tokio::test]
async fn test_healthz_reports_missing_reclaimer() {
    let (app, state) = setup_test_app(Some(Arc::new(UnavailableReclaimer))).await;
    state.monitor.start().unwrap();

    let (_, health) = send_json(app, "GET", "/healthz", None).await;
    assert_eq!(health["components"][components::RECLAIMER]["status"], "degraded");

    state.monitor.stop();
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state) = setup_test_app(None).await;

    let (status, readiness) = send_json(app, "GET", "/readyz", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
    assert!(readiness["reason"].is_string());
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app(None).await;
    state.health_registry.set_ready(true).await;

    let (status, readiness) = send_json(app, "GET", "/readyz", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app(None).await;

    let (status, body) = send(app, "GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("memwatch_ticks_total"));
}

#[tokio::test]
async fn test_usage_reads_current_snapshot() {
    let (app, state) = setup_test_app(None).await;

    let (status, usage) = send_json(app, "GET", "/memory/usage", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["heap_used"], 2048);
    assert_eq!(usage["heap_total"], 4096);
    assert_eq!(usage["heap_used_percent"], 50.0);
    assert!(state.monitor.history().is_empty());
}

#[tokio::test]
async fn test_stats_with_empty_history() {
    let (app, _state) = setup_test_app(None).await;

    let (status, stats) = send_json(app, "GET", "/memory/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(stats["peak"].is_null());
    assert!(stats["average"].is_null());
    assert_eq!(stats["gc_stats"]["count"], 0);
}

#[tokio::test]
async fn test_start_and_stop_lifecycle() {
    let (app, state) = setup_test_app(None).await;

    let (status, started) = send_json(app.clone(), "POST", "/memory/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["success"], true);
    assert!(state.monitor.is_running());

    let (_, again) = send_json(app.clone(), "POST", "/memory/start", None).await;
    assert_eq!(again["success"], true);
    assert_eq!(again["message"], "Memory monitoring is already running");

    let (_, history) = send_json(app.clone(), "GET", "/memory/history", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (status, stopped) = send_json(app, "POST", "/memory/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["success"], true);
    assert!(!state.monitor.is_running());
}

#[tokio::test]
async fn test_history_limit_keeps_most_recent() {
    let (app, state) = setup_test_app(None).await;
    state.monitor.start().unwrap();
    state.monitor.stop();
    state.monitor.start().unwrap();
    state.monitor.stop();

    let (status, history) = send_json(app.clone(), "GET", "/memory/history?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (_, full) = send_json(app, "GET", "/memory/history", None).await;
    assert_eq!(full.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_force_gc_updates_stats() {
    let (app, _state) = setup_test_app(None).await;

    let (status, response) = send_json(app.clone(), "POST", "/memory/gc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);

    let (status, stats) = send_json(app, "GET", "/memory/gc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["available"], true);
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["memory_freed"], 1024);
}

#[tokio::test]
async fn test_force_gc_unavailable_returns_503() {
    let (app, _state) = setup_test_app(Some(Arc::new(UnavailableReclaimer))).await;

    let (status, response) = send_json(app.clone(), "POST", "/memory/gc", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["success"], false);
    assert!(response["message"].is_string());

    let (_, stats) = send_json(app, "GET", "/memory/gc", None).await;
    assert_eq!(stats["available"], false);
    assert_eq!(stats["count"], 0);
}

#[tokio::test]
async fn test_update_config_applies_patch() {
    let (app, _state) = setup_test_app(None).await;

    let (status, response) = send_json(
        app.clone(),
        "PUT",
        "/memory/config",
        Some(r#"{"interval_ms": 5000, "history_limit": 10}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);

    let (_, config) = send_json(app, "GET", "/memory/config", None).await;
    assert_eq!(config["interval_ms"], 5000);
    assert_eq!(config["history_limit"], 10);
    assert_eq!(config["warning_threshold"], 80.0);
}

#[tokio::test]
async fn test_update_config_rejects_invalid_thresholds() {
    let (app, state) = setup_test_app(None).await;

    let (status, response) = send_json(
        app,
        "PUT",
        "/memory/config",
        Some(r#"{"warning_threshold": 95.0}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(state.monitor.config().warning_threshold, 80.0);
}

#[tokio::test]
async fn test_update_config_malformed_body_keeps_error_shape() {
    let (app, state) = setup_test_app(None).await;

    let (status, response) =
        send_json(app.clone(), "PUT", "/memory/config", Some(r#"{"interval_ms": "#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert!(response["message"].is_string());

    let (status, response) = send_json(
        app,
        "PUT",
        "/memory/config",
        Some(r#"{"interval_ms": "fast"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["success"], false);
    assert_eq!(state.monitor.config().interval_ms, 30_000);
}
