//! Anomaly detection for memory usage patterns
//!
//! This module provides detection for:
//! - Memory leaks (an active run of heap growth over a trailing window)
//! - Threshold crossings (warning and critical usage tiers)

mod classifier;
mod leak_detector;

pub use classifier::classify;
pub use leak_detector::{
    LeakAssessment, LeakDetector, GROWTH_STREAK_RATIO, LEAK_WINDOW_SAMPLES,
    MIN_GROWTH_RATE_MB_PER_SEC,
};
