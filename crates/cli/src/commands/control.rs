//! Monitoring lifecycle and configuration commands

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, ConfigPatch, ControlResponse, MonitorConfig};
use crate::output::{print_json, print_success, OutputFormat};

async fn lifecycle(client: &ApiClient, path: &str, format: OutputFormat) -> Result<()> {
    let response: ControlResponse = client.post(path).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&response.message),
    }

    Ok(())
}

/// Start monitoring on the agent
pub async fn start(client: &ApiClient, format: OutputFormat) -> Result<()> {
    lifecycle(client, "memory/start", format).await
}

/// Stop monitoring on the agent
pub async fn stop(client: &ApiClient, format: OutputFormat) -> Result<()> {
    lifecycle(client, "memory/stop", format).await
}

fn print_config(config: &MonitorConfig) {
    println!("{}", "Monitor Configuration".bold());
    println!("{}", "=".repeat(50));
    println!("Interval:             {} ms", config.interval_ms);
    println!("Warning Threshold:    {:.1}%", config.warning_threshold);
    println!("Critical Threshold:   {:.1}%", config.critical_threshold);
    println!(
        "Auto Reclaim:         {}",
        if config.auto_gc {
            "enabled".green()
        } else {
            "disabled".yellow()
        }
    );
    println!("Auto Reclaim At:      {:.1}%", config.auto_gc_threshold);
    println!("History Limit:        {}", config.history_limit);
}

/// Show the active configuration, or apply `patch` first when it sets anything
pub async fn config(client: &ApiClient, patch: ConfigPatch, format: OutputFormat) -> Result<()> {
    if !patch.is_empty() {
        let response: ControlResponse = client.put("memory/config", &patch).await?;
        if format == OutputFormat::Table {
            print_success(&response.message);
            println!();
        }
    }

    let config: MonitorConfig = client.get("memory/config").await?;

    match format {
        OutputFormat::Json => print_json(&config)?,
        OutputFormat::Table => print_config(&config),
    }

    Ok(())
}
