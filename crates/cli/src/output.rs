//! Output formatting utilities

use chrono::{TimeZone, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a byte count with binary units, e.g. `1.50 MB`
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    let sign = if bytes < 0 { "-" } else { "" };
    let magnitude = bytes.unsigned_abs();

    let mut exponent = 0;
    while exponent < UNITS.len() - 1 && magnitude >= 1024u64.pow(exponent as u32 + 1) {
        exponent += 1;
    }

    if exponent == 0 {
        return format!("{}{} Bytes", sign, magnitude);
    }

    let scaled = magnitude as f64 / 1024u64.pow(exponent as u32) as f64;
    format!("{}{:.2} {}", sign, scaled, UNITS[exponent])
}

/// Format Unix milliseconds as a UTC timestamp
pub fn format_timestamp(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => millis.to_string(),
    }
}

/// Color a used fraction against the warning and critical thresholds
pub fn color_percent(percent: f64, warning: f64, critical: f64) -> String {
    let formatted = format!("{:.2}%", percent);
    if percent >= critical {
        formatted.red().bold().to_string()
    } else if percent >= warning {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color freed bytes; growth during collection shows red
pub fn color_freed(freed: i64) -> String {
    let formatted = format_bytes(freed);
    if freed < 0 {
        formatted.red().to_string()
    } else {
        formatted.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(1023), "1023 Bytes");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_bytes(-1536), "-1.50 KB");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_color_percent_bands() {
        colored::control::set_override(false);
        assert_eq!(color_percent(12.345, 80.0, 90.0), "12.35%");
        assert_eq!(color_percent(90.0, 80.0, 90.0), "90.00%");
    }
}
