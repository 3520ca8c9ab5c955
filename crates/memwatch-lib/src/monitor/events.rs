//! Typed monitor events

use serde::{Deserialize, Serialize};

use crate::models::{Alert, LeakReport, MemorySnapshot, ReclamationOutcome};

/// Events published to subscribers, one variant per event kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum MonitorEvent {
    UsageUpdate(MemorySnapshot),
    Warning(Alert),
    Critical(Alert),
    LeakDetected(LeakReport),
    GcExecuted(ReclamationOutcome),
}

impl MonitorEvent {
    /// Wire name of the event kind
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::UsageUpdate(_) => "usage-update",
            MonitorEvent::Warning(_) => "warning",
            MonitorEvent::Critical(_) => "critical",
            MonitorEvent::LeakDetected(_) => "leak-detected",
            MonitorEvent::GcExecuted(_) => "gc-executed",
        }
    }
}
