//! Threshold classification for memory usage
//!
//! Maps a snapshot's used fraction onto a severity tier. Alerts are not
//! deduplicated: a tick that stays inside a tier raises the alert again.

use crate::models::{now_millis, Alert, AlertSeverity, MemorySnapshot, MonitorConfig};

/// Classify a snapshot against the active thresholds.
///
/// The critical tier is checked first, so a used fraction equal to both
/// thresholds resolves to `Critical`.
pub fn classify(snapshot: &MemorySnapshot, config: &MonitorConfig) -> Option<Alert> {
    let percent = snapshot.heap_used_percent;

    let (severity, threshold, message) = if percent >= config.critical_threshold {
        (
            AlertSeverity::Critical,
            config.critical_threshold,
            format!("Memory usage at critical level: {:.2}%", percent),
        )
    } else if percent >= config.warning_threshold {
        (
            AlertSeverity::Warning,
            config.warning_threshold,
            format!("Memory usage is high: {:.2}%", percent),
        )
    } else {
        return None;
    };

    Some(Alert {
        severity,
        usage: *snapshot,
        threshold,
        message,
        timestamp: now_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_percent(percent: u64) -> MemorySnapshot {
        MemorySnapshot {
            heap_used_percent: percent as f64,
            ..MemorySnapshot::new(0, 100, percent, 0, 1)
        }
    }

    fn config(warning: f64, critical: f64) -> MonitorConfig {
        MonitorConfig {
            warning_threshold: warning,
            critical_threshold: critical,
            ..Default::default()
        }
    }

    #[test]
    fn test_below_warning() {
        assert!(classify(&at_percent(79), &config(80.0, 90.0)).is_none());
    }

    #[test]
    fn test_exactly_warning() {
        let alert = classify(&at_percent(80), &config(80.0, 90.0)).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.threshold, 80.0);
        assert_eq!(alert.message, "Memory usage is high: 80.00%");
    }

    #[test]
    fn test_between_tiers() {
        let alert = classify(&at_percent(85), &config(80.0, 90.0)).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_exactly_critical() {
        let alert = classify(&at_percent(90), &config(80.0, 90.0)).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert_eq!(alert.threshold, 90.0);
        assert!(alert.message.contains("critical"));
    }

    #[test]
    fn test_critical_wins_when_both_match() {
        // thresholds that would never pass validation, classifier still orders tiers
        let alert = classify(&at_percent(70), &config(70.0, 70.0)).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_alert_carries_snapshot() {
        let snapshot = at_percent(95);
        let alert = classify(&snapshot, &config(80.0, 90.0)).unwrap();
        assert_eq!(alert.usage, snapshot);
        assert!(alert.timestamp > 0);
    }
}
