//! Memory snapshot sources
//!
//! This module provides sources that read instantaneous memory counters
//! for the current process. Reading never fails: counters that cannot be
//! read are reported as zero so a sampling tick always produces a snapshot.

mod allocator;
mod procfs;


pub use allocator::{AllocatorSource, TrackingAllocator};
pub use procfs::{ProcStatus, ProcfsSource};

use crate::models::MemorySnapshot;
use std::sync::Arc;

/// Trait for memory counter sources
pub trait MemorySource: Send + Sync {
    /// Capture the current memory counters
    fn capture(&self) -> MemorySnapshot;
}

impl<S: MemorySource + ?Sized> MemorySource for Arc<S> {
    fn capture(&self) -> MemorySnapshot {
        (**self).capture()
    }
}

/// Create the default source for this host
pub fn default_source() -> Arc<dyn MemorySource> {
    tracing::info!("Using procfs memory source");
    Arc::new(ProcfsSource::new())
}
