//! Memory reclamation
//!
//! Wraps the host's explicit collection trigger, measures heap usage
//! before and after each run, and keeps lifetime statistics.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::collector::MemorySource;
use crate::error::{MonitorError, Result};
use crate::models::{now_millis, ReclamationOutcome, ReclamationStats};
use crate::observability::format_bytes;

/// Trait for host collection triggers
pub trait Reclaimer: Send + Sync {
    /// Whether the host exposes an explicit collection trigger
    fn is_available(&self) -> bool;

    /// Ask the allocator to return free memory to the OS
    fn reclaim(&self) -> Result<()>;
}

/// Reclaimer backed by glibc `malloc_trim`
#[derive(Debug, Default, Clone, Copy)]
pub struct MallocTrimReclaimer;

impl MallocTrimReclaimer {
    pub fn new() -> Self {
        Self
    }
}

impl Reclaimer for MallocTrimReclaimer {
    fn is_available(&self) -> bool {
        cfg!(all(target_os = "linux", target_env = "gnu"))
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn reclaim(&self) -> Result<()> {
        // SAFETY: malloc_trim only walks glibc's own arenas and takes no pointers.
        let released = unsafe { libc::malloc_trim(0) };
        debug!(released = released != 0, "malloc_trim returned");
        Ok(())
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn reclaim(&self) -> Result<()> {
        Err(MonitorError::ReclamationUnavailable)
    }
}

/// Reclaimer for hosts without any collection trigger
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableReclaimer;

impl Reclaimer for UnavailableReclaimer {
    fn is_available(&self) -> bool {
        false
    }

    fn reclaim(&self) -> Result<()> {
        Err(MonitorError::ReclamationUnavailable)
    }
}

/// Pick the reclaimer supported by this build target
pub fn default_reclaimer() -> Arc<dyn Reclaimer> {
    let reclaimer = MallocTrimReclaimer::new();
    if reclaimer.is_available() {
        Arc::new(reclaimer)
    } else {
        warn!("No explicit collection trigger on this host, reclamation disabled");
        Arc::new(UnavailableReclaimer)
    }
}

/// Runs reclamation and aggregates its statistics
pub struct ReclamationController {
    reclaimer: Arc<dyn Reclaimer>,
    stats: ReclamationStats,
}

impl ReclamationController {
    pub fn new(reclaimer: Arc<dyn Reclaimer>) -> Self {
        Self {
            reclaimer,
            stats: ReclamationStats::default(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.reclaimer.is_available()
    }

    /// Force one reclamation pass.
    ///
    /// Statistics change only when the collector call succeeds. `freed` is
    /// recorded as measured and may be negative.
    pub fn force_reclaim(&mut self, source: &dyn MemorySource) -> Result<ReclamationOutcome> {
        if !self.reclaimer.is_available() {
            warn!("Reclamation requested but no collection trigger is available");
            return Err(MonitorError::ReclamationUnavailable);
        }

        let before = source.capture();
        let start = Instant::now();

        self.reclaimer.reclaim()?;

        let duration = start.elapsed().as_millis() as u64;
        let after = source.capture();
        let freed = before.heap_used as i64 - after.heap_used as i64;

        self.stats.count += 1;
        self.stats.total_time += duration;
        self.stats.average_time = self.stats.total_time as f64 / self.stats.count as f64;
        self.stats.last_executed = Some(now_millis());
        self.stats.memory_freed += freed;

        debug!(
            duration_ms = duration,
            freed = %format_bytes(freed),
            before_heap_used = %format_bytes(before.heap_used as i64),
            after_heap_used = %format_bytes(after.heap_used as i64),
            "Memory reclamation complete"
        );

        Ok(ReclamationOutcome {
            before,
            after,
            duration,
            freed,
        })
    }

    pub fn stats(&self) -> ReclamationStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemorySnapshot;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// Heap counter shared between a source and a reclaimer
    struct SharedHeap {
        used: AtomicU64,
    }

    impl MemorySource for SharedHeap {
        fn capture(&self) -> MemorySnapshot {
            MemorySnapshot::new(0, 100_000_000, self.used.load(Ordering::SeqCst), 0, now_millis())
        }
    }

    /// Frees exactly `freed` bytes from the shared heap on each call
    struct FixedReclaimer {
        heap: Arc<SharedHeap>,
        freed: u64,
        calls: AtomicUsize,
    }

    impl Reclaimer for FixedReclaimer {
        fn is_available(&self) -> bool {
            true
        }

        fn reclaim(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.heap.used.fetch_sub(self.freed, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingReclaimer;

    impl Reclaimer for FailingReclaimer {
        fn is_available(&self) -> bool {
            true
        }

        fn reclaim(&self) -> Result<()> {
            Err(MonitorError::ReclamationFailed("collector busy".to_string()))
        }
    }

    fn fixture(freed: u64) -> (Arc<SharedHeap>, ReclamationController) {
        let heap = Arc::new(SharedHeap {
            used: AtomicU64::new(50_000_000),
        });
        let reclaimer = Arc::new(FixedReclaimer {
            heap: heap.clone(),
            freed,
            calls: AtomicUsize::new(0),
        });
        (heap, ReclamationController::new(reclaimer))
    }

    #[test]
    fn test_reclaim_records_exact_freed_bytes() {
        let (heap, mut controller) = fixture(4096);

        let outcome = controller.force_reclaim(heap.as_ref()).unwrap();

        assert_eq!(outcome.freed, 4096);
        assert_eq!(outcome.before.heap_used - outcome.after.heap_used, 4096);

        let stats = controller.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.memory_freed, 4096);
        assert!(stats.last_executed.is_some());
    }

    #[test]
    fn test_stats_accumulate() {
        let (heap, mut controller) = fixture(1000);

        controller.force_reclaim(heap.as_ref()).unwrap();
        controller.force_reclaim(heap.as_ref()).unwrap();
        controller.force_reclaim(heap.as_ref()).unwrap();

        let stats = controller.stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.memory_freed, 3000);
        assert!(
            (stats.average_time - stats.total_time as f64 / 3.0).abs() < f64::EPSILON
        );
    }

    #[test]
    fn test_unavailable_reclaimer() {
        let heap = SharedHeap {
            used: AtomicU64::new(1),
        };
        let mut controller = ReclamationController::new(Arc::new(UnavailableReclaimer));

        let result = controller.force_reclaim(&heap);
        assert!(matches!(result, Err(MonitorError::ReclamationUnavailable)));
        assert_eq!(controller.stats(), ReclamationStats::default());
    }

    #[test]
    fn test_failed_reclaim_leaves_stats_untouched() {
        let heap = SharedHeap {
            used: AtomicU64::new(1),
        };
        let mut controller = ReclamationController::new(Arc::new(FailingReclaimer));

        let result = controller.force_reclaim(&heap);
        assert!(matches!(result, Err(MonitorError::ReclamationFailed(_))));
        assert_eq!(controller.stats().count, 0);
    }

    #[test]
    fn test_negative_freed_not_clamped() {
        struct GrowingReclaimer(Arc<SharedHeap>);

        impl Reclaimer for GrowingReclaimer {
            fn is_available(&self) -> bool {
                true
            }

            fn reclaim(&self) -> Result<()> {
                self.0.used.fetch_add(2048, Ordering::SeqCst);
                Ok(())
            }
        }

        let heap = Arc::new(SharedHeap {
            used: AtomicU64::new(10_000),
        });
        let mut controller = ReclamationController::new(Arc::new(GrowingReclaimer(heap.clone())));

        let outcome = controller.force_reclaim(heap.as_ref()).unwrap();
        assert_eq!(outcome.freed, -2048);
        assert_eq!(controller.stats().memory_freed, -2048);
    }

    #[test]
    fn test_malloc_trim_availability_matches_target() {
        let reclaimer = MallocTrimReclaimer::new();
        assert_eq!(
            reclaimer.is_available(),
            cfg!(all(target_os = "linux", target_env = "gnu"))
        );
        if reclaimer.is_available() {
            assert!(reclaimer.reclaim().is_ok());
        }
    }
}
