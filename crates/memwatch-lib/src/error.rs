//! Error types for the memory monitor

use thiserror::Error;

/// Errors surfaced by monitor control operations.
///
/// None of these are fatal to the hosting process: the monitor keeps
/// sampling after any of them is returned.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The host offers no explicit collection trigger.
    #[error("memory reclamation is not available on this host")]
    ReclamationUnavailable,

    /// The collection trigger exists but reported a failure.
    #[error("memory reclamation failed: {0}")]
    ReclamationFailed(String),

    /// A configuration value violates the threshold ordering or range rules.
    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),

    /// Sampling needs a Tokio runtime to schedule ticks on.
    #[error("monitoring must be started from within a Tokio runtime")]
    RuntimeUnavailable,
}

pub type Result<T> = std::result::Result<T, MonitorError>;
