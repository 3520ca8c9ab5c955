//! procfs memory source
//!
//! Reads `/proc/self/status` and maps its fields onto a snapshot:
//! - VmRSS for the resident set size
//! - VmData for the heap capacity
//! - RssAnon for heap bytes in use
//! - RssFile + RssShmem for off-heap usage

use super::MemorySource;
use crate::models::{now_millis, MemorySnapshot};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Memory fields parsed from a status file, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStatus {
    pub vm_rss: u64,
    pub vm_data: u64,
    pub rss_anon: u64,
    pub rss_file: u64,
    pub rss_shmem: u64,
}

impl ProcStatus {
    /// Parse status file contents.
    ///
    /// Values are reported by the kernel in kB and converted to bytes.
    /// Missing or malformed fields stay zero.
    pub fn parse(content: &str) -> Self {
        let fields: HashMap<&str, u64> = content
            .lines()
            .filter_map(|line| {
                let (key, rest) = line.split_once(':')?;
                let value = rest.split_whitespace().next()?.parse::<u64>().ok()?;
                Some((key.trim(), value * 1024))
            })
            .collect();

        let field = |name: &str| fields.get(name).copied().unwrap_or(0);

        Self {
            vm_rss: field("VmRSS"),
            vm_data: field("VmData"),
            rss_anon: field("RssAnon"),
            rss_file: field("RssFile"),
            rss_shmem: field("RssShmem"),
        }
    }

    /// Read and parse a status file, returning zeroed fields when unreadable
    pub fn read(path: &std::path::Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to read process status");
                Self::default()
            }
        }
    }

    pub fn into_snapshot(self, timestamp: i64) -> MemorySnapshot {
        MemorySnapshot::new(
            self.vm_rss,
            self.vm_data,
            self.rss_anon,
            self.rss_file + self.rss_shmem,
            timestamp,
        )
    }
}

/// Source backed by the procfs status file of the current process
pub struct ProcfsSource {
    status_path: PathBuf,
}

impl ProcfsSource {
    pub fn new() -> Self {
        Self {
            status_path: PathBuf::from("/proc/self/status"),
        }
    }

    /// Create source with custom status path (for testing)
    pub fn with_status_path(status_path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: status_path.into(),
        }
    }

    pub fn read_status(&self) -> ProcStatus {
        ProcStatus::read(&self.status_path)
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for ProcfsSource {
    fn capture(&self) -> MemorySnapshot {
        self.read_status().into_snapshot(now_millis())
    }
}
