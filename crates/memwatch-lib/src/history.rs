//! Bounded snapshot history
//!
//! A ring of the most recent snapshots with FIFO eviction once the
//! configured capacity is reached. Snapshots are stored by value, so
//! readers always get copies.

use crate::models::{MemoryAverage, MemorySnapshot};
use std::collections::VecDeque;

/// Ring buffer of memory snapshots, oldest first
#[derive(Debug, Clone)]
pub struct HistoryRing {
    buffer: VecDeque<MemorySnapshot>,
    capacity: usize,
}

impl HistoryRing {
    /// Create a ring holding at most `capacity` snapshots (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
        }
    }

    /// Append a snapshot, evicting the oldest entry when full
    pub fn append(&mut self, snapshot: MemorySnapshot) {
        while self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(snapshot);
    }

    /// All retained snapshots, oldest to newest
    pub fn all(&self) -> Vec<MemorySnapshot> {
        self.buffer.iter().copied().collect()
    }

    /// Most recently appended snapshot
    pub fn latest(&self) -> Option<&MemorySnapshot> {
        self.buffer.back()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change capacity, evicting the oldest entries if the ring shrinks
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Snapshot with the highest heap usage; the earliest one wins ties
    pub fn peak(&self) -> Option<MemorySnapshot> {
        self.buffer.iter().fold(None, |peak, snapshot| match peak {
            Some(max) if snapshot.heap_used <= max.heap_used => Some(max),
            _ => Some(*snapshot),
        })
    }

    /// Per-field arithmetic mean, `None` when the ring is empty.
    ///
    /// Byte counts are rounded to the nearest byte.
    pub fn average(&self) -> Option<MemoryAverage> {
        if self.buffer.is_empty() {
            return None;
        }

        let count = self.buffer.len() as f64;
        let mut rss = 0u128;
        let mut heap_total = 0u128;
        let mut heap_used = 0u128;
        let mut external = 0u128;
        let mut percent = 0.0;

        for snapshot in &self.buffer {
            rss += snapshot.rss as u128;
            heap_total += snapshot.heap_total as u128;
            heap_used += snapshot.heap_used as u128;
            external += snapshot.external as u128;
            percent += snapshot.heap_used_percent;
        }

        let mean = |sum: u128| (sum as f64 / count).round() as u64;

        Some(MemoryAverage {
            rss: mean(rss),
            heap_total: mean(heap_total),
            heap_used: mean(heap_used),
            external: mean(external),
            heap_used_percent: percent / count,
        })
    }
}
