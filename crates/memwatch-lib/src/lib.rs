//! Library for in-process memory health monitoring
//!
//! This crate provides the core functionality for:
//! - Periodic memory snapshots from procfs or a tracking allocator
//! - Bounded snapshot history with peak and average summaries
//! - Leak detection and threshold alerts
//! - Explicit memory reclamation with cumulative statistics
//! - A monitor that schedules all of the above and publishes typed events
//! - Health checks and observability

pub mod anomaly;
pub mod collector;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod reclaim;

pub use error::{MonitorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use monitor::{LifecycleOutcome, Monitor, MonitorBuilder, MonitorEvent};
pub use observability::{format_bytes, MonitorMetrics, StructuredLogger};
