//! Observability infrastructure for the memory monitor
//!
//! Provides:
//! - Prometheus metrics (usage gauges, alert and reclamation counters, tick latency)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, register_gauge, Gauge,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::models::{Alert, AlertSeverity, LeakReport, MemorySnapshot, ReclamationOutcome};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MonitorMetricsInner {
    tick_latency_seconds: Histogram,
    reclaim_latency_seconds: Histogram,
    rss_bytes: IntGauge,
    heap_total_bytes: IntGauge,
    heap_used_bytes: IntGauge,
    external_bytes: IntGauge,
    heap_used_percent: Gauge,
    history_items: IntGauge,
    monitoring_active: IntGauge,
    ticks: IntCounter,
    warnings: IntCounter,
    criticals: IntCounter,
    leaks_detected: IntCounter,
    reclamations: IntCounter,
    reclamation_failures: IntCounter,
    bytes_freed: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "memwatch_tick_latency_seconds",
                "Time spent in one sampling tick, including triggered reclamation",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            reclaim_latency_seconds: register_histogram!(
                "memwatch_reclaim_latency_seconds",
                "Time spent inside the collection trigger",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register reclaim_latency_seconds"),

            rss_bytes: register_int_gauge!(
                "memwatch_rss_bytes",
                "Resident set size at the last sample"
            )
            .expect("Failed to register rss_bytes"),

            heap_total_bytes: register_int_gauge!(
                "memwatch_heap_total_bytes",
                "Heap capacity at the last sample"
            )
            .expect("Failed to register heap_total_bytes"),

            heap_used_bytes: register_int_gauge!(
                "memwatch_heap_used_bytes",
                "Heap bytes in use at the last sample"
            )
            .expect("Failed to register heap_used_bytes"),

            external_bytes: register_int_gauge!(
                "memwatch_external_bytes",
                "Off-heap usage at the last sample"
            )
            .expect("Failed to register external_bytes"),

            heap_used_percent: register_gauge!(
                "memwatch_heap_used_percent",
                "Heap used fraction (0-100) at the last sample"
            )
            .expect("Failed to register heap_used_percent"),

            history_items: register_int_gauge!(
                "memwatch_history_items",
                "Number of snapshots retained in history"
            )
            .expect("Failed to register history_items"),

            monitoring_active: register_int_gauge!(
                "memwatch_monitoring_active",
                "1 while the sampling loop is running"
            )
            .expect("Failed to register monitoring_active"),

            ticks: register_int_counter!(
                "memwatch_ticks_total",
                "Total number of sampling ticks"
            )
            .expect("Failed to register ticks"),

            warnings: register_int_counter!(
                "memwatch_warnings_total",
                "Total number of warning alerts"
            )
            .expect("Failed to register warnings"),

            criticals: register_int_counter!(
                "memwatch_criticals_total",
                "Total number of critical alerts"
            )
            .expect("Failed to register criticals"),

            leaks_detected: register_int_counter!(
                "memwatch_leaks_detected_total",
                "Total number of leak detections"
            )
            .expect("Failed to register leaks_detected"),

            reclamations: register_int_counter!(
                "memwatch_reclamations_total",
                "Total number of completed reclamations"
            )
            .expect("Failed to register reclamations"),

            reclamation_failures: register_int_counter!(
                "memwatch_reclamation_failures_total",
                "Total number of failed or unavailable reclamations"
            )
            .expect("Failed to register reclamation_failures"),

            bytes_freed: register_int_gauge!(
                "memwatch_bytes_freed",
                "Cumulative bytes freed by reclamation (may be negative)"
            )
            .expect("Failed to register bytes_freed"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    /// Record one completed tick
    pub fn observe_tick(&self, duration_secs: f64, history_len: usize) {
        let inner = self.inner();
        inner.tick_latency_seconds.observe(duration_secs);
        inner.ticks.inc();
        inner.history_items.set(history_len as i64);
    }

    /// Update usage gauges from a snapshot
    pub fn set_usage(&self, snapshot: &MemorySnapshot) {
        let inner = self.inner();
        inner.rss_bytes.set(snapshot.rss as i64);
        inner.heap_total_bytes.set(snapshot.heap_total as i64);
        inner.heap_used_bytes.set(snapshot.heap_used as i64);
        inner.external_bytes.set(snapshot.external as i64);
        inner.heap_used_percent.set(snapshot.heap_used_percent);
    }

    pub fn set_monitoring_active(&self, active: bool) {
        self.inner().monitoring_active.set(i64::from(active));
    }

    pub fn inc_alert(&self, severity: AlertSeverity) {
        match severity {
            AlertSeverity::Warning => self.inner().warnings.inc(),
            AlertSeverity::Critical => self.inner().criticals.inc(),
        }
    }

    pub fn inc_leaks_detected(&self) {
        self.inner().leaks_detected.inc();
    }

    /// Record a completed reclamation
    pub fn observe_reclamation(&self, outcome: &ReclamationOutcome, cumulative_freed: i64) {
        let inner = self.inner();
        inner.reclamations.inc();
        inner
            .reclaim_latency_seconds
            .observe(outcome.duration as f64 / 1000.0);
        inner.bytes_freed.set(cumulative_freed);
    }

    pub fn inc_reclamation_failures(&self) {
        self.inner().reclamation_failures.inc();
    }
}

/// Structured logger for monitor events
///
/// Provides consistent JSON-formatted logging for alerts, leak
/// detections, reclamations and lifecycle changes.
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Log a threshold alert
    pub fn log_alert(&self, alert: &Alert) {
        match alert.severity {
            AlertSeverity::Critical => {
                error!(
                    event = "memory_critical",
                    host = %self.host,
                    severity = %alert.severity,
                    heap_used_percent = alert.usage.heap_used_percent,
                    threshold = alert.threshold,
                    heap_used = %format_bytes(alert.usage.heap_used as i64),
                    "{}", alert.message
                );
            }
            AlertSeverity::Warning => {
                warn!(
                    event = "memory_warning",
                    host = %self.host,
                    severity = %alert.severity,
                    heap_used_percent = alert.usage.heap_used_percent,
                    threshold = alert.threshold,
                    heap_used = %format_bytes(alert.usage.heap_used as i64),
                    "{}", alert.message
                );
            }
        }
    }

    /// Log a leak detection
    pub fn log_leak(&self, report: &LeakReport) {
        error!(
            event = "memory_leak_detected",
            host = %self.host,
            consecutive_growth = report.consecutive_growth,
            growth_rate_mb_per_sec = report.growth_rate,
            time_span_ms = report.time_span,
            memory_growth = %format_bytes(report.memory_growth),
            "Possible memory leak detected"
        );
    }

    /// Log a completed reclamation
    pub fn log_reclamation(&self, outcome: &ReclamationOutcome) {
        info!(
            event = "gc_executed",
            host = %self.host,
            duration_ms = outcome.duration,
            freed = %format_bytes(outcome.freed),
            before_heap_used = %format_bytes(outcome.before.heap_used as i64),
            after_heap_used = %format_bytes(outcome.after.heap_used as i64),
            "Memory reclamation executed"
        );
    }

    /// Log monitor startup
    pub fn log_startup(&self, version: &str, interval_ms: u64) {
        info!(
            event = "monitor_started",
            host = %self.host,
            version = %version,
            interval_ms = interval_ms,
            "Memory monitor started"
        );
    }

    /// Log monitor shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            host = %self.host,
            reason = %reason,
            "Memory monitor shutting down"
        );
    }
}

/// Format a byte count with binary units, e.g. `1.50 MB`
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let sign = if bytes < 0 { "-" } else { "" };
    let magnitude = bytes.unsigned_abs();

    let mut exponent = 0;
    while exponent < UNITS.len() - 1 && magnitude >= 1024u64.pow(exponent as u32 + 1) {
        exponent += 1;
    }

    if exponent == 0 {
        return format!("{}{} Bytes", sign, magnitude);
    }

    let scaled = magnitude as f64 / 1024u64.pow(exponent as u32) as f64;
    format!("{}{:.2} {}", sign, scaled, UNITS[exponent])
}
