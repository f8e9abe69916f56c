//! Message-to-state dispatch

use tracing::{debug, info, warn};

use super::message::ServerMessage;
use crate::alert::AlertCenter;
use crate::registry::Registry;

/// Decode a text frame and apply it
///
/// Malformed frames are logged and dropped; they never change state.
pub fn dispatch_text(text: &str, registry: &Registry, alerts: &mut AlertCenter) {
    match ServerMessage::decode(text) {
        Ok(message) => dispatch(message, registry, alerts),
        Err(e) => warn!("Discarding malformed message: {}", e),
    }
}

/// Apply a decoded message to the registry or the alert channel
pub fn dispatch(message: ServerMessage, registry: &Registry, alerts: &mut AlertCenter) {
    match message {
        ServerMessage::Status(update) => {
            debug!(
                balance = update.balance,
                open_positions = update.open_positions,
                "Status update"
            );
            registry.balance.set(update.balance);
            registry.open_positions.set(update.open_positions);
            registry.positions.set(update.positions);
        }
        ServerMessage::Screener(rows) => {
            debug!("Screener update ({} rows)", rows.len());
            registry.screener_data.set(rows);
        }
        ServerMessage::EntrySignal(signal) => {
            alerts.raise(&signal);
        }
        ServerMessage::Signal(data) => {
            info!("New signal: {}", data);
        }
        ServerMessage::Unknown(kind) => {
            debug!("Ignoring message with unknown type {:?}", kind);
        }
    }
}
