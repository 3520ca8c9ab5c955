//! Core data models for the memory monitor

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MonitorError, Result};

/// Current wall-clock time as Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single point-in-time reading of process memory counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Resident set size in bytes
    pub rss: u64,
    /// Total heap capacity in bytes
    pub heap_total: u64,
    /// Heap bytes in use
    pub heap_used: u64,
    /// Off-heap usage in bytes
    pub external: u64,
    /// `heap_used / heap_total * 100`, fixed at capture time
    pub heap_used_percent: f64,
    /// Capture time, Unix milliseconds
    pub timestamp: i64,
}

impl MemorySnapshot {
    /// Build a snapshot, deriving the used fraction from the heap counters
    pub fn new(rss: u64, heap_total: u64, heap_used: u64, external: u64, timestamp: i64) -> Self {
        let heap_used_percent = if heap_total == 0 {
            0.0
        } else {
            heap_used as f64 / heap_total as f64 * 100.0
        };

        Self {
            rss,
            heap_total,
            heap_used,
            external,
            heap_used_percent,
            timestamp,
        }
    }
}

/// Per-session monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sampling interval in milliseconds
    pub interval_ms: u64,
    /// Used-fraction at which a warning alert is raised
    pub warning_threshold: f64,
    /// Used-fraction at which a critical alert is raised
    pub critical_threshold: f64,
    /// Whether the monitor triggers reclamation on its own
    pub auto_gc: bool,
    /// Used-fraction at which autonomous reclamation runs
    pub auto_gc_threshold: f64,
    /// Number of snapshots retained in history
    pub history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            warning_threshold: 80.0,
            critical_threshold: 90.0,
            auto_gc: true,
            auto_gc_threshold: 85.0,
            history_limit: 100,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Check range and ordering rules.
    ///
    /// The autonomous reclamation trigger only has to be a valid percentage;
    /// placing it outside the warning/critical band is allowed but logged.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "interval_ms must be greater than zero".to_string(),
            ));
        }

        if !(self.warning_threshold > 0.0
            && self.warning_threshold < self.critical_threshold
            && self.critical_threshold <= 100.0)
        {
            return Err(MonitorError::InvalidConfig(format!(
                "thresholds must satisfy 0 < warning < critical <= 100 (got warning={}, critical={})",
                self.warning_threshold, self.critical_threshold
            )));
        }

        if !(self.auto_gc_threshold > 0.0 && self.auto_gc_threshold <= 100.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "auto_gc_threshold must be in (0, 100] (got {})",
                self.auto_gc_threshold
            )));
        }

        if self.history_limit == 0 {
            return Err(MonitorError::InvalidConfig(
                "history_limit must be at least 1".to_string(),
            ));
        }

        if self.auto_gc_threshold < self.warning_threshold
            || self.auto_gc_threshold > self.critical_threshold
        {
            warn!(
                auto_gc_threshold = self.auto_gc_threshold,
                warning_threshold = self.warning_threshold,
                critical_threshold = self.critical_threshold,
                "Autonomous reclamation trigger lies outside the warning/critical band"
            );
        }

        Ok(())
    }

    /// Merge a partial update over this config and validate the result
    pub fn merged(&self, patch: &MonitorConfigPatch) -> Result<Self> {
        let merged = Self {
            interval_ms: patch.interval_ms.unwrap_or(self.interval_ms),
            warning_threshold: patch.warning_threshold.unwrap_or(self.warning_threshold),
            critical_threshold: patch.critical_threshold.unwrap_or(self.critical_threshold),
            auto_gc: patch.auto_gc.unwrap_or(self.auto_gc),
            auto_gc_threshold: patch.auto_gc_threshold.unwrap_or(self.auto_gc_threshold),
            history_limit: patch.history_limit.unwrap_or(self.history_limit),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial configuration as received from the control surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_gc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_gc_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

/// Alert severity tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Threshold alert raised for a single tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    /// Snapshot that crossed the threshold
    pub usage: MemorySnapshot,
    /// Threshold that was crossed
    pub threshold: f64,
    pub message: String,
    pub timestamp: i64,
}

/// Result of one leak heuristic evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakReport {
    pub detected: bool,
    /// Strictly increasing pairs in the run ending at the newest sample
    pub consecutive_growth: usize,
    /// Heap growth across the window in MB/s
    pub growth_rate: f64,
    /// Window span in milliseconds
    pub time_span: i64,
    /// Heap growth across the window in bytes
    pub memory_growth: i64,
}

/// Cumulative reclamation statistics for the monitor's lifetime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReclamationStats {
    pub count: u64,
    /// Total time spent reclaiming, milliseconds
    pub total_time: u64,
    /// Mean time per reclamation, milliseconds
    pub average_time: f64,
    /// Unix milliseconds of the last run
    pub last_executed: Option<i64>,
    /// Cumulative bytes freed; negative when usage grew during collection
    pub memory_freed: i64,
}

/// Payload of a completed reclamation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReclamationOutcome {
    pub before: MemorySnapshot,
    pub after: MemorySnapshot,
    /// Milliseconds spent in the collector call
    pub duration: u64,
    pub freed: i64,
}

/// Per-field means over the retained history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAverage {
    pub rss: u64,
    pub heap_total: u64,
    pub heap_used: u64,
    pub external: u64,
    pub heap_used_percent: f64,
}

/// Aggregated view returned by the stats query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub current: MemorySnapshot,
    pub peak: Option<MemorySnapshot>,
    pub average: Option<MemoryAverage>,
    pub gc_stats: ReclamationStats,
}

/// Lifecycle state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Idle,
    Running,
}

/// Structured result for control operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

impl ControlResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
