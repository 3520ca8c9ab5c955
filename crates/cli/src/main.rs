//! memwatch CLI
//!
//! A command-line tool for inspecting and controlling the memory monitor
//! hosted by a memwatch agent.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{control, gc, memory};

/// memwatch CLI
#[derive(Parser)]
#[command(name = "memwatch")]
#[command(author, version, about = "CLI for the memwatch memory-health monitor", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via MEMWATCH_API_URL env var)
    #[arg(long, env = "MEMWATCH_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current memory reading
    Usage,

    /// Show current, peak and average usage with reclamation totals
    Stats,

    /// Show retained memory samples
    History {
        /// Show only the most recent N samples
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Memory reclamation
    #[command(subcommand)]
    Gc(GcCommands),

    /// Start monitoring
    Start,

    /// Stop monitoring
    Stop,

    /// Show or update the monitor configuration
    Config {
        /// Sampling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Used percentage that raises a warning
        #[arg(long)]
        warning_threshold: Option<f64>,

        /// Used percentage that raises a critical alert
        #[arg(long)]
        critical_threshold: Option<f64>,

        /// Enable or disable autonomous reclamation
        #[arg(long)]
        auto_gc: Option<bool>,

        /// Used percentage that triggers autonomous reclamation
        #[arg(long)]
        auto_gc_threshold: Option<f64>,

        /// Number of samples to retain
        #[arg(long)]
        history_limit: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum GcCommands {
    /// Show reclamation statistics
    Stats,

    /// Run one reclamation pass now
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = config::Config::load()?;
    let format = file_config.format(cli.format)?;
    let client = client::ApiClient::new(&file_config.api_url(cli.api_url))?;

    match cli.command {
        Commands::Usage => memory::show_usage(&client, format).await?,
        Commands::Stats => memory::show_stats(&client, format).await?,
        Commands::History { limit } => memory::show_history(&client, limit, format).await?,
        Commands::Gc(gc_cmd) => match gc_cmd {
            GcCommands::Stats => gc::show_gc_stats(&client, format).await?,
            GcCommands::Run => gc::run_gc(&client, format).await?,
        },
        Commands::Start => control::start(&client, format).await?,
        Commands::Stop => control::stop(&client, format).await?,
        Commands::Config {
            interval_ms,
            warning_threshold,
            critical_threshold,
            auto_gc,
            auto_gc_threshold,
            history_limit,
        } => {
            let patch = client::ConfigPatch {
                interval_ms,
                warning_threshold,
                critical_threshold,
                auto_gc,
                auto_gc_threshold,
                history_limit,
            };
            control::config(&client, patch, format).await?;
        }
    }

    Ok(())
}
