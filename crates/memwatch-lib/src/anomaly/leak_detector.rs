//! Memory leak detection
//!
//! Detects leaks by watching a fixed trailing window of snapshots for an
//! active run of strictly increasing heap usage combined with a sustained
//! growth rate across the whole window.

use std::collections::VecDeque;

use crate::models::{LeakReport, MemorySnapshot};

/// Samples kept in the trailing window
pub const LEAK_WINDOW_SAMPLES: usize = 10;

/// Fraction of the window that must be an unbroken growth run
pub const GROWTH_STREAK_RATIO: f64 = 0.7;

/// Minimum growth rate across the window, MB/s
pub const MIN_GROWTH_RATE_MB_PER_SEC: f64 = 1.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of feeding one snapshot to the detector
#[derive(Debug, Clone, PartialEq)]
pub enum LeakAssessment {
    /// The window is not full yet; no leak can be declared
    InsufficientSamples { have: usize, need: usize },
    /// The window is full and the heuristic ran
    Evaluated(LeakReport),
}

impl LeakAssessment {
    pub fn is_detected(&self) -> bool {
        matches!(self, LeakAssessment::Evaluated(report) if report.detected)
    }

    pub fn report(&self) -> Option<&LeakReport> {
        match self {
            LeakAssessment::Evaluated(report) => Some(report),
            LeakAssessment::InsufficientSamples { .. } => None,
        }
    }
}

/// Sliding-window leak detector
#[derive(Debug, Clone)]
pub struct LeakDetector {
    window: VecDeque<MemorySnapshot>,
    /// Number of samples in the trailing window
    pub window_size: usize,
    /// Required growth run as a fraction of `window_size`
    pub streak_ratio: f64,
    /// Growth rate (MB/s) that must be exceeded
    pub min_growth_rate: f64,
}

impl LeakDetector {
    pub fn new(window_size: usize, streak_ratio: f64, min_growth_rate: f64) -> Self {
        let window_size = window_size.max(2);
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            streak_ratio,
            min_growth_rate,
        }
    }

    /// Growth run length needed to declare a leak
    pub fn required_streak(&self) -> usize {
        (self.streak_ratio * self.window_size as f64).ceil() as usize
    }

    /// Push a snapshot into the window and evaluate the heuristic
    pub fn observe(&mut self, snapshot: MemorySnapshot) -> LeakAssessment {
        self.window.push_back(snapshot);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        if self.window.len() < self.window_size {
            return LeakAssessment::InsufficientSamples {
                have: self.window.len(),
                need: self.window_size,
            };
        }

        LeakAssessment::Evaluated(self.evaluate())
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Drop every sample in the window
    pub fn reset(&mut self) {
        self.window.clear();
    }

    fn evaluate(&self) -> LeakReport {
        let (Some(oldest), Some(newest)) = (self.window.front(), self.window.back()) else {
            return LeakReport {
                detected: false,
                consecutive_growth: 0,
                growth_rate: 0.0,
                time_span: 0,
                memory_growth: 0,
            };
        };

        let time_span = newest.timestamp - oldest.timestamp;
        let memory_growth = newest.heap_used as i64 - oldest.heap_used as i64;
        let growth_rate = growth_rate_mb_per_sec(memory_growth, time_span);
        let consecutive_growth = self.active_growth_streak();

        let detected =
            consecutive_growth >= self.required_streak() && growth_rate > self.min_growth_rate;

        LeakReport {
            detected,
            consecutive_growth,
            growth_rate,
            time_span,
            memory_growth,
        }
    }

    /// Strictly increasing pairs in the run that ends at the newest sample
    fn active_growth_streak(&self) -> usize {
        let mut streak = 0;
        for (prev, next) in self.window.iter().zip(self.window.iter().skip(1)) {
            if next.heap_used > prev.heap_used {
                streak += 1;
            } else {
                streak = 0;
            }
        }
        streak
    }
}

impl Default for LeakDetector {
    fn default() -> Self {
        Self::new(
            LEAK_WINDOW_SAMPLES,
            GROWTH_STREAK_RATIO,
            MIN_GROWTH_RATE_MB_PER_SEC,
        )
    }
}

/// Growth in MB/s; a non-positive span yields zero
fn growth_rate_mb_per_sec(memory_growth: i64, time_span_ms: i64) -> f64 {
    if time_span_ms <= 0 {
        return 0.0;
    }
    memory_growth as f64 / (time_span_ms as f64 / 1000.0) / BYTES_PER_MB
}
