//! Memory usage, stats and history commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, MemorySnapshot, MemoryStats, MonitorConfig};
use crate::output::{
    color_percent, format_bytes, format_timestamp, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the history table
#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Heap Used")]
    heap_used: String,
    #[tabled(rename = "Heap Total")]
    heap_total: String,
    #[tabled(rename = "Used")]
    percent: String,
    #[tabled(rename = "RSS")]
    rss: String,
    #[tabled(rename = "External")]
    external: String,
}

impl SnapshotRow {
    fn new(snapshot: &MemorySnapshot, config: &MonitorConfig) -> Self {
        Self {
            timestamp: format_timestamp(snapshot.timestamp),
            heap_used: format_bytes(snapshot.heap_used as i64),
            heap_total: format_bytes(snapshot.heap_total as i64),
            percent: color_percent(
                snapshot.heap_used_percent,
                config.warning_threshold,
                config.critical_threshold,
            ),
            rss: format_bytes(snapshot.rss as i64),
            external: format_bytes(snapshot.external as i64),
        }
    }
}

fn print_snapshot(snapshot: &MemorySnapshot, config: &MonitorConfig) {
    println!("Heap Used:    {}", format_bytes(snapshot.heap_used as i64));
    println!("Heap Total:   {}", format_bytes(snapshot.heap_total as i64));
    println!(
        "Used:         {}",
        color_percent(
            snapshot.heap_used_percent,
            config.warning_threshold,
            config.critical_threshold
        )
    );
    println!("RSS:          {}", format_bytes(snapshot.rss as i64));
    println!("External:     {}", format_bytes(snapshot.external as i64));
}

/// Show the current memory reading
pub async fn show_usage(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let usage: MemorySnapshot = client.get("memory/usage").await?;

    match format {
        OutputFormat::Json => print_json(&usage)?,
        OutputFormat::Table => {
            let config: MonitorConfig = client.get("memory/config").await?;

            println!("{}", "Memory Usage".bold());
            println!("{}", "=".repeat(50));
            println!("Captured:     {}", format_timestamp(usage.timestamp).cyan());
            println!();
            print_snapshot(&usage, &config);
        }
    }

    Ok(())
}

/// Show current, peak and average usage plus reclamation totals
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats: MemoryStats = client.get("memory/stats").await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            let config: MonitorConfig = client.get("memory/config").await?;

            println!("{}", "Memory Stats".bold());
            println!("{}", "=".repeat(50));
            println!("{}", "Current".bold());
            println!("{}", "-".repeat(50));
            print_snapshot(&stats.current, &config);
            println!();

            match (&stats.peak, &stats.average) {
                (Some(peak), Some(average)) => {
                    println!("{}", "History".bold());
                    println!("{}", "-".repeat(50));
                    println!(
                        "Peak:         {} at {}",
                        format_bytes(peak.heap_used as i64),
                        format_timestamp(peak.timestamp)
                    );
                    println!(
                        "Average:      {} ({:.2}%)",
                        format_bytes(average.heap_used as i64),
                        average.heap_used_percent
                    );
                    println!("Average RSS:  {}", format_bytes(average.rss as i64));
                }
                _ => print_warning("No samples collected yet"),
            }
            println!();

            println!("{}", "Reclamation".bold());
            println!("{}", "-".repeat(50));
            println!("Runs:         {}", stats.gc_stats.count);
            println!(
                "Freed:        {}",
                format_bytes(stats.gc_stats.memory_freed)
            );
        }
    }

    Ok(())
}

/// Show retained snapshots, oldest first
pub async fn show_history(
    client: &ApiClient,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let path = match limit {
        Some(limit) => format!("memory/history?limit={}", limit),
        None => "memory/history".to_string(),
    };
    let history: Vec<MemorySnapshot> = client.get(&path).await?;

    match format {
        OutputFormat::Json => print_json(&history)?,
        OutputFormat::Table => {
            if history.is_empty() {
                print_warning("No samples collected yet; is monitoring running?");
                return Ok(());
            }

            let config: MonitorConfig = client.get("memory/config").await?;
            let rows: Vec<SnapshotRow> = history
                .iter()
                .map(|s| SnapshotRow::new(s, &config))
                .collect();

            println!("{}", "Memory History".bold());
            print_table(&rows);
            println!("\nTotal: {} samples", history.len());
        }
    }

    Ok(())
}
