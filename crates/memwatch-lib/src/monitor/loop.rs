//! Sampling schedule
//!
//! Each armed schedule sleeps for one interval, runs a tick, then sleeps
//! again. The next sleep only starts after the previous tick returned, so
//! a slow tick delays the schedule instead of overlapping with it.

use std::sync::Weak;
use std::time::Duration;

use tracing::debug;

use super::MonitorInner;
use crate::models::MonitorState;

/// Run the re-arming schedule for one monitoring generation.
///
/// The task exits once the monitor is dropped, stopped, or restarted
/// under a newer generation.
pub(super) async fn run_schedule(monitor: Weak<MonitorInner>, generation: u64, interval: Duration) {
    debug!(generation, interval_ms = interval.as_millis() as u64, "Sampling schedule armed");

    loop {
        tokio::time::sleep(interval).await;

        if !tick_if_current(&monitor, generation) {
            debug!(generation, "Sampling schedule retired");
            break;
        }
    }
}

/// Run one tick if this schedule still owns the monitor
fn tick_if_current(monitor: &Weak<MonitorInner>, generation: u64) -> bool {
    let Some(inner) = monitor.upgrade() else {
        return false;
    };

    let mut core = inner.lock();
    if core.generation != generation || core.lifecycle != MonitorState::Running {
        return false;
    }

    inner.tick(&mut core);
    true
}
