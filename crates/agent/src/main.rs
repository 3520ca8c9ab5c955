//! memwatch agent
//!
//! Runs a memory monitor for this process and exposes its control
//! surface, health probes and Prometheus metrics over HTTP.

use anyhow::{Context, Result};
use memwatch_agent::{api, config::AgentConfig};
use memwatch_lib::{HealthRegistry, Monitor, MonitorEvent, StructuredLogger};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting memwatch-agent");

    let config = AgentConfig::load()?;
    info!(host_name = %config.host_name, api_port = config.api_port, "Agent configured");

    let monitor = Monitor::builder()
        .config(config.monitor_config()?)
        .host(config.host_name.clone())
        .build()
        .context("Failed to build memory monitor")?;

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let logger = StructuredLogger::new(&config.host_name);
    logger.log_startup(AGENT_VERSION, monitor.config().interval_ms);

    tokio::spawn(event_tap(monitor.subscribe()));

    if config.autostart {
        monitor.start().context("Failed to start memory monitoring")?;
    }
    health_registry.sync_from_monitor(&monitor).await;

    let app_state = Arc::new(api::AppState::new(monitor.clone(), health_registry.clone()));
    health_registry.set_ready(true).await;

    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        served = &mut api_handle => {
            match served {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    health_registry.set_ready(false).await;
    monitor.cleanup();
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}

/// Log every monitor event as JSON until the monitor goes away
async fn event_tap(mut events: broadcast::Receiver<MonitorEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => debug!(event = event.name(), %payload, "Monitor event"),
                Err(e) => warn!(event = event.name(), error = %e, "Failed to encode monitor event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event tap fell behind, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
