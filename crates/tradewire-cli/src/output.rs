//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON lines output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::Local;
use serde::Serialize;

use tradewire_core::{ConnectionStatus, Position, ScreenerEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// One JSON object per line
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a connection status change
    ///
    /// Status is the one update quiet mode still prints.
    pub fn print_status(&self, status: ConnectionStatus) {
        match self.format {
            OutputFormat::Human => println!("{} status: {}", timestamp(), status),
            OutputFormat::Json => println!("{}", slot_line("connection_status", &status)),
            OutputFormat::Quiet => println!("{}", status),
        }
    }

    pub fn print_balance(&self, balance: f64) {
        match self.format {
            OutputFormat::Human => println!("{} balance: ${:.2}", timestamp(), balance),
            OutputFormat::Json => println!("{}", slot_line("balance", &balance)),
            OutputFormat::Quiet => {}
        }
    }

    pub fn print_open_positions(&self, count: u64) {
        match self.format {
            OutputFormat::Human => println!("{} open positions: {}", timestamp(), count),
            OutputFormat::Json => println!("{}", slot_line("open_positions", &count)),
            OutputFormat::Quiet => {}
        }
    }

    pub fn print_positions(&self, positions: &[Position]) {
        match self.format {
            OutputFormat::Human => {
                if positions.is_empty() {
                    println!("{} positions: none", timestamp());
                    return;
                }
                let symbols: Vec<&str> = positions
                    .iter()
                    .map(|p| p.symbol().unwrap_or("?"))
                    .collect();
                println!(
                    "{} positions ({}): {}",
                    timestamp(),
                    positions.len(),
                    symbols.join(", ")
                );
            }
            OutputFormat::Json => println!("{}", slot_line("positions", &positions)),
            OutputFormat::Quiet => {}
        }
    }

    pub fn print_screener(&self, rows: &[ScreenerEntry]) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "{} screener: {} row(s){}",
                    timestamp(),
                    rows.len(),
                    screener_preview(rows, 5)
                );
            }
            OutputFormat::Json => println!("{}", slot_line("screener_data", &rows)),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn timestamp() -> String {
    Local::now().format("[%H:%M:%S]").to_string()
}

fn slot_line<T: Serialize + ?Sized>(slot: &str, value: &T) -> serde_json::Value {
    serde_json::json!({ "slot": slot, "value": value })
}

/// Up to `max` symbols, e.g. ` - BTCUSDT, ETHUSDT, ...`
fn screener_preview(rows: &[ScreenerEntry], max: usize) -> String {
    let symbols: Vec<&str> = rows.iter().filter_map(|r| r.symbol()).take(max).collect();
    if symbols.is_empty() {
        return String::new();
    }
    let more = if rows.len() > symbols.len() { ", ..." } else { "" };
    format!(" - {}{}", symbols.join(", "), more)
}
