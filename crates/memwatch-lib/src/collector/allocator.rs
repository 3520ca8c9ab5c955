//! Allocation-counting memory source
//!
//! `TrackingAllocator` wraps another `GlobalAlloc` and keeps a running
//! count of live heap bytes. Install it with `#[global_allocator]` and pair
//! it with an `AllocatorSource` to sample exact heap usage instead of the
//! page-level approximation procfs offers.

use super::{MemorySource, ProcfsSource};
use crate::models::{now_millis, MemorySnapshot};
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Global allocator wrapper that counts live and peak heap bytes
pub struct TrackingAllocator<A = System> {
    inner: A,
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl TrackingAllocator<System> {
    pub const fn new() -> Self {
        Self::with_allocator(System)
    }
}

impl Default for TrackingAllocator<System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> TrackingAllocator<A> {
    pub const fn with_allocator(inner: A) -> Self {
        Self {
            inner,
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Bytes currently allocated through this allocator
    pub fn live_bytes(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Highest live byte count observed
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    fn record_alloc(&self, size: usize) {
        let live = self.live.fetch_add(size, Ordering::Relaxed) + size;
        self.peak.fetch_max(live, Ordering::Relaxed);
    }

    fn record_dealloc(&self, size: usize) {
        self.live.fetch_sub(size, Ordering::Relaxed);
    }
}

// SAFETY: every call is forwarded unchanged to the wrapped allocator; the
// wrapper only updates atomic counters, which never allocate.
unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        self.record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            self.record_dealloc(layout.size());
            self.record_alloc(new_size);
        }
        new_ptr
    }
}

/// Source that reports heap usage from a `TrackingAllocator`.
///
/// `heap_used` is the live allocation count and `heap_total` the data
/// segment (`VmData`), raised to the live count when the counter runs
/// ahead of it so the used fraction never exceeds 100%. RSS and off-heap
/// usage still come from procfs.
pub struct AllocatorSource<A: 'static = System> {
    allocator: &'static TrackingAllocator<A>,
    procfs: ProcfsSource,
}

impl<A: 'static> AllocatorSource<A> {
    pub fn new(allocator: &'static TrackingAllocator<A>) -> Self {
        Self {
            allocator,
            procfs: ProcfsSource::new(),
        }
    }

    /// Create source with a custom procfs reader (for testing)
    pub fn with_procfs(allocator: &'static TrackingAllocator<A>, procfs: ProcfsSource) -> Self {
        Self { allocator, procfs }
    }
}

impl<A: Sync + 'static> MemorySource for AllocatorSource<A> {
    fn capture(&self) -> MemorySnapshot {
        let status = self.procfs.read_status();
        let live = self.allocator.live_bytes() as u64;
        MemorySnapshot::new(
            status.vm_rss,
            status.vm_data.max(live),
            live,
            status.rss_file + status.rss_shmem,
            now_millis(),
        )
    }
}
