//! Memory monitor orchestration
//!
//! The monitor owns the sampling schedule, the active configuration, the
//! lifecycle state and event publication, and composes the snapshot
//! source, history ring, leak detector, threshold classifier and
//! reclamation controller.
//!
//! All mutable state lives behind a single mutex. A tick holds it for its
//! whole synchronous body, including any reclamation it triggers, so ticks
//! never overlap and queries always see a consistent view.

mod events;
mod r#loop;


pub use events::MonitorEvent;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::anomaly::{classify, LeakAssessment, LeakDetector};
use crate::collector::{default_source, MemorySource};
use crate::error::{MonitorError, Result};
use crate::history::HistoryRing;
use crate::models::{
    AlertSeverity, ControlResponse, MemorySnapshot, MemoryStats, MonitorConfig,
    MonitorConfigPatch, MonitorState, ReclamationStats,
};
use crate::observability::{format_bytes, MonitorMetrics, StructuredLogger};
use crate::reclaim::{default_reclaimer, ReclamationController, Reclaimer};

/// Buffered events per subscriber before lagging receivers drop the oldest
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of a start or stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleOutcome {
    Started,
    /// Start requested while already running; nothing changed
    AlreadyRunning,
    Stopped,
    /// Stop requested while idle; nothing changed
    AlreadyIdle,
}

impl LifecycleOutcome {
    pub fn is_redundant(&self) -> bool {
        matches!(
            self,
            LifecycleOutcome::AlreadyRunning | LifecycleOutcome::AlreadyIdle
        )
    }
}

impl From<LifecycleOutcome> for ControlResponse {
    fn from(outcome: LifecycleOutcome) -> Self {
        match outcome {
            LifecycleOutcome::Started => ControlResponse::ok("Memory monitoring started"),
            LifecycleOutcome::AlreadyRunning => {
                ControlResponse::ok("Memory monitoring is already running")
            }
            LifecycleOutcome::Stopped => ControlResponse::ok("Memory monitoring stopped"),
            LifecycleOutcome::AlreadyIdle => ControlResponse::ok("Memory monitoring is not running"),
        }
    }
}

/// Mutable monitor state, guarded by `MonitorInner::core`
struct MonitorCore {
    config: MonitorConfig,
    lifecycle: MonitorState,
    history: HistoryRing,
    leak_detector: LeakDetector,
    reclamation: ReclamationController,
    /// Bumped on every start and stop; schedules from older generations retire
    generation: u64,
    schedule: Option<JoinHandle<()>>,
}

pub(crate) struct MonitorInner {
    source: Arc<dyn MemorySource>,
    core: Mutex<MonitorCore>,
    events: broadcast::Sender<MonitorEvent>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl MonitorInner {
    fn lock(&self) -> MutexGuard<'_, MonitorCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: MonitorEvent) {
        // no subscribers is not an error
        let _ = self.events.send(event);
    }

    /// One sampling tick under the caller's lock
    fn tick(&self, core: &mut MonitorCore) {
        let started = Instant::now();
        let config = core.config.clone();

        let snapshot = self.source.capture();

        core.history.append(snapshot);
        self.metrics.set_usage(&snapshot);
        self.publish(MonitorEvent::UsageUpdate(snapshot));

        match core.leak_detector.observe(snapshot) {
            LeakAssessment::Evaluated(report) if report.detected => {
                self.logger.log_leak(&report);
                self.metrics.inc_leaks_detected();
                self.publish(MonitorEvent::LeakDetected(report));
            }
            LeakAssessment::Evaluated(_) => {}
            LeakAssessment::InsufficientSamples { have, need } => {
                debug!(have, need, "Leak window not yet full");
            }
        }

        if let Some(alert) = classify(&snapshot, &config) {
            self.logger.log_alert(&alert);
            self.metrics.inc_alert(alert.severity);
            let event = match alert.severity {
                AlertSeverity::Warning => MonitorEvent::Warning(alert),
                AlertSeverity::Critical => MonitorEvent::Critical(alert),
            };
            self.publish(event);
        }

        if config.auto_gc
            && core.reclamation.is_available()
            && snapshot.heap_used_percent >= config.auto_gc_threshold
        {
            debug!(
                heap_used_percent = snapshot.heap_used_percent,
                threshold = config.auto_gc_threshold,
                "Autonomous reclamation triggered"
            );
            // failures are logged inside; the tick's other outputs stand
            let _ = self.reclaim(core);
        }

        debug!(
            heap_used = %format_bytes(snapshot.heap_used as i64),
            heap_total = %format_bytes(snapshot.heap_total as i64),
            heap_used_percent = %format!("{:.2}%", snapshot.heap_used_percent),
            rss = %format_bytes(snapshot.rss as i64),
            "Memory check complete"
        );

        self.metrics
            .observe_tick(started.elapsed().as_secs_f64(), core.history.len());
    }

    /// Run reclamation and publish its outcome
    fn reclaim(&self, core: &mut MonitorCore) -> Result<i64> {
        match core.reclamation.force_reclaim(self.source.as_ref()) {
            Ok(outcome) => {
                let freed = outcome.freed;
                self.logger.log_reclamation(&outcome);
                self.metrics
                    .observe_reclamation(&outcome, core.reclamation.stats().memory_freed);
                self.publish(MonitorEvent::GcExecuted(outcome));
                Ok(freed)
            }
            Err(e) => {
                warn!(error = %e, "Memory reclamation did not run");
                self.metrics.inc_reclamation_failures();
                Err(e)
            }
        }
    }

    fn start_locked(
        self: &Arc<Self>,
        core: &mut MonitorCore,
        runtime: &Handle,
    ) -> LifecycleOutcome {
        if core.lifecycle == MonitorState::Running {
            warn!("Memory monitoring is already running");
            return LifecycleOutcome::AlreadyRunning;
        }

        info!(interval_ms = core.config.interval_ms, "Starting memory monitoring");
        core.lifecycle = MonitorState::Running;
        core.generation += 1;
        self.metrics.set_monitoring_active(true);

        // first observation without waiting a full interval
        self.tick(core);

        core.schedule = Some(runtime.spawn(r#loop::run_schedule(
            Arc::downgrade(self),
            core.generation,
            core.config.interval(),
        )));

        LifecycleOutcome::Started
    }

    fn stop_locked(&self, core: &mut MonitorCore) -> LifecycleOutcome {
        if core.lifecycle == MonitorState::Idle {
            warn!("Memory monitoring is not running");
            return LifecycleOutcome::AlreadyIdle;
        }

        info!("Stopping memory monitoring");
        core.lifecycle = MonitorState::Idle;
        core.generation += 1;
        if let Some(schedule) = core.schedule.take() {
            schedule.abort();
        }
        self.metrics.set_monitoring_active(false);

        LifecycleOutcome::Stopped
    }
}

/// Resident memory-health monitor.
///
/// Cheap to clone; clones share one monitor. Construct it once with
/// [`Monitor::builder`] and hand clones to whatever issues control or
/// query calls.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

impl Monitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Start sampling: one immediate tick, then one tick per interval.
    ///
    /// Fails with [`MonitorError::RuntimeUnavailable`] outside a Tokio
    /// runtime, leaving the monitor idle.
    pub fn start(&self) -> Result<LifecycleOutcome> {
        let runtime = current_runtime()?;
        let mut core = self.inner.lock();
        Ok(self.inner.start_locked(&mut core, &runtime))
    }

    /// Stop scheduling future ticks. An in-flight tick completes first.
    pub fn stop(&self) -> LifecycleOutcome {
        let mut core = self.inner.lock();
        self.inner.stop_locked(&mut core)
    }

    /// Apply a partial configuration update.
    ///
    /// On validation failure the active configuration is unchanged. When
    /// monitoring is running it restarts under the new configuration.
    pub fn update_config(&self, patch: &MonitorConfigPatch) -> Result<ControlResponse> {
        let mut core = self.inner.lock();
        let config = core.config.merged(patch)?;

        let restart = if core.lifecycle == MonitorState::Running {
            Some(current_runtime()?)
        } else {
            None
        };

        info!(?config, "Updating memory monitor configuration");

        if restart.is_some() {
            self.inner.stop_locked(&mut core);
        }

        core.history.set_capacity(config.history_limit);
        core.config = config;

        if let Some(runtime) = restart {
            self.inner.start_locked(&mut core, &runtime);
        }

        Ok(ControlResponse::ok("Memory monitor configuration updated"))
    }

    /// Force one reclamation pass on behalf of an external caller
    pub fn force_reclaim(&self) -> Result<ControlResponse> {
        let mut core = self.inner.lock();
        let freed = self.inner.reclaim(&mut core)?;
        Ok(ControlResponse::ok(format!(
            "Memory reclamation executed, freed {}",
            format_bytes(freed)
        )))
    }

    /// Read the current counters without touching history
    pub fn current_usage(&self) -> MemorySnapshot {
        self.inner.source.capture()
    }

    pub fn stats(&self) -> MemoryStats {
        let current = self.inner.source.capture();
        let core = self.inner.lock();
        MemoryStats {
            current,
            peak: core.history.peak(),
            average: core.history.average(),
            gc_stats: core.reclamation.stats(),
        }
    }

    /// Retained snapshots, oldest first
    pub fn history(&self) -> Vec<MemorySnapshot> {
        self.inner.lock().history.all()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn gc_stats(&self) -> ReclamationStats {
        self.inner.lock().reclamation.stats()
    }

    pub fn config(&self) -> MonitorConfig {
        self.inner.lock().config.clone()
    }

    pub fn state(&self) -> MonitorState {
        self.inner.lock().lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }

    /// Whether the host exposes an explicit collection trigger
    pub fn reclamation_available(&self) -> bool {
        self.inner.lock().reclamation.is_available()
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events.subscribe()
    }

    /// Stop monitoring and drop retained samples. Subscribers stay attached.
    pub fn cleanup(&self) {
        info!("Cleaning up memory monitor");
        let mut core = self.inner.lock();
        if core.lifecycle == MonitorState::Running {
            self.inner.stop_locked(&mut core);
        }
        core.history.clear();
        core.leak_detector.reset();
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|_| MonitorError::RuntimeUnavailable)
}

/// Builder for creating a monitor
pub struct MonitorBuilder {
    config: MonitorConfig,
    source: Option<Arc<dyn MemorySource>>,
    reclaimer: Option<Arc<dyn Reclaimer>>,
    leak_detector: LeakDetector,
    host: String,
}

impl MonitorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: MonitorConfig::default(),
            source: None,
            reclaimer: None,
            leak_detector: LeakDetector::default(),
            host: "localhost".to_string(),
        }
    }

    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the snapshot source (defaults to procfs)
    pub fn source(mut self, source: Arc<dyn MemorySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the collection trigger (defaults to the host's allocator trim)
    pub fn reclaimer(mut self, reclaimer: Arc<dyn Reclaimer>) -> Self {
        self.reclaimer = Some(reclaimer);
        self
    }

    /// Override the leak heuristic parameters
    pub fn leak_detector(mut self, leak_detector: LeakDetector) -> Self {
        self.leak_detector = leak_detector;
        self
    }

    /// Host name attached to structured log records
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Build the monitor in the `Idle` state
    pub fn build(self) -> Result<Monitor> {
        self.config.validate()?;

        let source = self.source.unwrap_or_else(default_source);
        let reclaimer = match self.reclaimer {
            Some(reclaimer) => {
                if self.config.auto_gc && !reclaimer.is_available() {
                    warn!("No collection trigger available, autonomous reclamation will not run");
                }
                reclaimer
            }
            None => default_reclaimer(),
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(config = ?self.config, host = %self.host, "Memory monitor initialized");

        let core = MonitorCore {
            history: HistoryRing::new(self.config.history_limit),
            config: self.config,
            lifecycle: MonitorState::Idle,
            leak_detector: self.leak_detector,
            reclamation: ReclamationController::new(reclaimer),
            generation: 0,
            schedule: None,
        };

        Ok(Monitor {
            inner: Arc::new(MonitorInner {
                source,
                core: Mutex::new(core),
                events,
                metrics: MonitorMetrics::new(),
                logger: StructuredLogger::new(self.host),
            }),
        })
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
