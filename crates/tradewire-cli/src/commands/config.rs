//! Config command handler

use std::path::Path;

use anyhow::Result;

use tradewire_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration
pub fn show(config: &Config, config_path: &Path, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "url": config.url,
                    "reconnect_delay_secs": config.reconnect_delay_secs,
                    "alert_timeout_secs": config.alert_timeout_secs,
                    "notifications": config.notifications,
                    "config_file": config_path,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.url);
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  url:                  {}", config.url);
            println!("  reconnect_delay_secs: {}", config.reconnect_delay_secs);
            println!("  alert_timeout_secs:   {}", config.alert_timeout_secs);
            println!("  notifications:        {}", config.notifications);
            println!();
            println!(
                "Config file: {}{}",
                config_path.display(),
                if config_path.exists() { "" } else { " (not found, using defaults)" }
            );
        }
    }

    Ok(())
}
