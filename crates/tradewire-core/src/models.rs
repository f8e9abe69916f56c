//! Data models for live trading state
//!
//! These are the payload types carried by server messages and held in the
//! registry slots. Unknown fields sent by the server are either kept
//! verbatim (records) or ignored (fixed-shape payloads).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Connection status published to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// A connection attempt is in progress
    #[default]
    Connecting,
    /// Connected and receiving messages
    Connected,
    /// Connection closed, a reconnect is pending
    Disconnected,
    /// The transport reported an error
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open position reported by the server
///
/// Position records are opaque: no field is required and every field is
/// kept as sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub Map<String, Value>);

impl Position {
    /// A record holding only a `symbol` field
    pub fn new(symbol: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("symbol".to_string(), Value::String(symbol.into()));
        Self(fields)
    }

    /// The position's symbol, if it has a string `symbol` field
    pub fn symbol(&self) -> Option<&str> {
        self.0.get("symbol").and_then(Value::as_str)
    }

    /// Look up an arbitrary field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// One row of a screener snapshot
///
/// The core does not interpret screener rows; they are passed to observers
/// exactly as received.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenerEntry(pub Map<String, Value>);

impl ScreenerEntry {
    /// The row's symbol, if it has a string `symbol` field
    pub fn symbol(&self) -> Option<&str> {
        self.0.get("symbol").and_then(Value::as_str)
    }

    /// Look up an arbitrary field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Account snapshot carried by a `status` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub balance: f64,
    pub open_positions: u64,
    /// Absent or null means no open positions
    #[serde(default, deserialize_with = "null_as_empty")]
    pub positions: Vec<Position>,
}

/// Entry signal carried by an `entry_signal` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub symbol: String,
    /// Signal direction, e.g. `LONG` or `SHORT`
    pub signal: String,
    pub price: f64,
    pub trend_score: f64,
    pub signal_strength: f64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Position>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let positions: Option<Vec<Position>> = Option::deserialize(deserializer)?;
    Ok(positions.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_update_missing_positions() {
        let update: StatusUpdate =
            serde_json::from_value(json!({"balance": 10.5, "open_positions": 0})).unwrap();
        assert_eq!(update.balance, 10.5);
        assert!(update.positions.is_empty());
    }

    #[test]
    fn test_status_update_null_positions() {
        let update: StatusUpdate = serde_json::from_value(
            json!({"balance": 1, "open_positions": 0, "positions": null}),
        )
        .unwrap();
        assert!(update.positions.is_empty());
    }

    #[test]
    fn test_position_keeps_all_fields() {
        let position: Position =
            serde_json::from_value(json!({"symbol": "BTCUSDT", "size": 0.5, "side": "LONG"}))
                .unwrap();
        assert_eq!(position.symbol(), Some("BTCUSDT"));
        assert_eq!(position.get("side"), Some(&json!("LONG")));
        assert_eq!(
            serde_json::to_value(&position).unwrap(),
            json!({"symbol": "BTCUSDT", "size": 0.5, "side": "LONG"})
        );
    }

    #[test]
    fn test_position_without_symbol() {
        let position: Position = serde_json::from_value(json!({"id": 7, "side": "LONG"})).unwrap();
        assert_eq!(position.symbol(), None);
        assert_eq!(position.get("id"), Some(&json!(7)));
    }

    #[test]
    fn test_status_update_accepts_positions_without_symbol() {
        let update: StatusUpdate = serde_json::from_value(
            json!({"balance": 1000, "open_positions": 1, "positions": [{"id": 7}]}),
        )
        .unwrap();
        assert_eq!(update.balance, 1000.0);
        assert_eq!(update.positions.len(), 1);
    }

    #[test]
    fn test_screener_entry_symbol() {
        let entry: ScreenerEntry =
            serde_json::from_value(json!({"symbol": "ETHUSDT", "score": 7})).unwrap();
        assert_eq!(entry.symbol(), Some("ETHUSDT"));
        assert_eq!(entry.get("score"), Some(&json!(7)));

        let entry = ScreenerEntry::default();
        assert_eq!(entry.symbol(), None);
    }

    #[test]
    fn test_entry_signal_ignores_unknown_fields() {
        let signal: EntrySignal = serde_json::from_value(json!({
            "symbol": "SOLUSDT",
            "signal": "LONG",
            "price": 142.1,
            "trend_score": 8.25,
            "signal_strength": 91.0,
            "timeframe": "5m"
        }))
        .unwrap();
        assert_eq!(signal.symbol, "SOLUSDT");
        assert_eq!(signal.signal, "LONG");
    }

    #[test]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Connecting);
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(
            serde_json::to_value(ConnectionStatus::Error).unwrap(),
            json!("error")
        );
    }
}
