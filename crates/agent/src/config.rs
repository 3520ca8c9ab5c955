//! Agent configuration

use anyhow::{Context, Result};
use memwatch_lib::MonitorConfig;
use serde::Deserialize;
use std::path::Path;

/// Base name of the optional configuration file (`memwatch.toml`, `memwatch.json`, ...)
const CONFIG_FILE_NAME: &str = "memwatch";

/// Prefix for environment overrides, e.g. `MEMWATCH_INTERVAL_MS`
const ENV_PREFIX: &str = "MEMWATCH";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Host name attached to structured log records
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// API server port for the control surface, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Start monitoring as soon as the agent is up
    #[serde(default = "default_autostart")]
    pub autostart: bool,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,

    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    #[serde(default = "default_auto_gc")]
    pub auto_gc: bool,

    #[serde(default = "default_auto_gc_threshold")]
    pub auto_gc_threshold: f64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_autostart() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    MonitorConfig::default().interval_ms
}

fn default_warning_threshold() -> f64 {
    MonitorConfig::default().warning_threshold
}

fn default_critical_threshold() -> f64 {
    MonitorConfig::default().critical_threshold
}

fn default_auto_gc() -> bool {
    MonitorConfig::default().auto_gc
}

fn default_auto_gc_threshold() -> f64 {
    MonitorConfig::default().auto_gc_threshold
}

fn default_history_limit() -> usize {
    MonitorConfig::default().history_limit
}

impl AgentConfig {
    /// Load configuration from `memwatch.*` in the working directory and
    /// `MEMWATCH_*` environment variables, the latter taking precedence
    pub fn load() -> Result<Self> {
        Self::build(config::File::with_name(CONFIG_FILE_NAME).required(false))
    }

    /// Load configuration from an explicit file plus the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(config::File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read agent configuration")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    /// The validated monitor configuration this agent runs with
    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        let config = MonitorConfig {
            interval_ms: self.interval_ms,
            warning_threshold: self.warning_threshold,
            critical_threshold: self.critical_threshold,
            auto_gc: self.auto_gc,
            auto_gc_threshold: self.auto_gc_threshold,
            history_limit: self.history_limit,
        };
        config
            .validate()
            .context("Invalid monitor settings in agent configuration")?;
        Ok(config)
    }
}
