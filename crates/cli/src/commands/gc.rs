//! Memory reclamation commands

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, ControlResponse, GcStatus};
use crate::output::{
    color_freed, format_timestamp, print_info, print_json, print_success, print_warning,
    OutputFormat,
};

/// Show cumulative reclamation statistics
pub async fn show_gc_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: GcStatus = client.get("memory/gc").await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("{}", "Reclamation Stats".bold());
            println!("{}", "=".repeat(50));

            if !status.available {
                print_warning("No collection trigger available on the agent host");
            }

            let stats = &status.stats;
            println!("Runs:           {}", stats.count);
            println!("Total Time:     {} ms", stats.total_time);
            println!("Average Time:   {:.2} ms", stats.average_time);
            println!("Memory Freed:   {}", color_freed(stats.memory_freed));
            match stats.last_executed {
                Some(ts) => println!("Last Run:       {}", format_timestamp(ts)),
                None => print_info("Reclamation has not run yet"),
            }
        }
    }

    Ok(())
}

/// Trigger one reclamation pass on the agent
pub async fn run_gc(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: ControlResponse = client.post("memory/gc").await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&response.message),
    }

    Ok(())
}
