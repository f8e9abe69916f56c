//! Watch command handler
//!
//! Connects to the data server and prints every registry update until
//! interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use tradewire_core::{
    AlertCenter, Config, ConnectionManager, ManagerConfig, Notifier, Registry, Subscription,
};

use crate::notifier::TerminalNotifier;
use crate::output::Output;

/// Stream live updates until Ctrl-C
pub async fn watch(config: &Config, output: &Output) -> Result<()> {
    let registry = Registry::new();
    let subscriptions = subscribe(&registry, *output);

    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier::new());
    let alerts = AlertCenter::new(notifier)
        .with_timeout(config.alert_timeout())
        .with_notifications(config.notifications);

    output.message(&format!("Connecting to {}...", config.url));

    let (manager, events) =
        ConnectionManager::websocket(ManagerConfig::from(config), registry.clone(), alerts);
    let handle = manager.spawn(events);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Interrupted, shutting down");
    handle.shutdown().await?;
    drop(subscriptions);

    output.success("Disconnected");
    Ok(())
}

/// Print every slot as it changes
fn subscribe(registry: &Registry, output: Output) -> Vec<Subscription> {
    vec![
        registry
            .connection_status
            .subscribe(move |status| output.print_status(*status)),
        registry
            .balance
            .subscribe(move |balance| output.print_balance(*balance)),
        registry
            .open_positions
            .subscribe(move |count| output.print_open_positions(*count)),
        registry
            .positions
            .subscribe(move |positions| output.print_positions(positions)),
        registry
            .screener_data
            .subscribe(move |rows| output.print_screener(rows)),
    ]
}
