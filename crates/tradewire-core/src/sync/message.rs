//! Server message types
//!
//! Messages are JSON text frames of the form `{"type": ..., "data": ...}`.
//! Decoding happens in two steps: the envelope is read first, then the
//! payload is validated against the shape its `type` declares. Unknown
//! types decode successfully as [`ServerMessage::Unknown`].

use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::models::{EntrySignal, ScreenerEntry, StatusUpdate};

pub const TYPE_STATUS: &str = "status";
pub const TYPE_SCREENER: &str = "screener";
pub const TYPE_ENTRY_SIGNAL: &str = "entry_signal";
pub const TYPE_SIGNAL: &str = "signal";

/// Messages received from the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Account balance and positions
    Status(StatusUpdate),
    /// Full screener snapshot
    Screener(Vec<ScreenerEntry>),
    /// Time-sensitive entry signal, surfaced as an alert
    EntrySignal(EntrySignal),
    /// Informational signal; carries no state
    Signal(Value),
    /// Any other `type`
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl ServerMessage {
    /// Decode a text frame
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(DecodeError::Envelope)?;

        let message = match envelope.kind.as_str() {
            TYPE_STATUS => ServerMessage::Status(payload(TYPE_STATUS, envelope.data)?),
            TYPE_SCREENER => ServerMessage::Screener(payload(TYPE_SCREENER, envelope.data)?),
            TYPE_ENTRY_SIGNAL => {
                ServerMessage::EntrySignal(payload(TYPE_ENTRY_SIGNAL, envelope.data)?)
            }
            TYPE_SIGNAL => ServerMessage::Signal(envelope.data),
            _ => ServerMessage::Unknown(envelope.kind),
        };

        Ok(message)
    }

    /// The `type` discriminator this message was decoded from
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::Status(_) => TYPE_STATUS,
            ServerMessage::Screener(_) => TYPE_SCREENER,
            ServerMessage::EntrySignal(_) => TYPE_ENTRY_SIGNAL,
            ServerMessage::Signal(_) => TYPE_SIGNAL,
            ServerMessage::Unknown(kind) => kind,
        }
    }
}

fn payload<T>(kind: &'static str, data: Value) -> Result<T, DecodeError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(data).map_err(|source| DecodeError::Payload { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    #[test]
    fn test_decode_status() {
        let msg = ServerMessage::decode(
            r#"{"type":"status","data":{"balance":1000,"open_positions":2,"positions":[{"symbol":"X"}]}}"#,
        )
        .unwrap();

        match msg {
            ServerMessage::Status(update) => {
                assert_eq!(update.balance, 1000.0);
                assert_eq!(update.open_positions, 2);
                assert_eq!(update.positions, vec![Position::new("X")]);
            }
            other => panic!("Expected Status, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_screener() {
        let msg = ServerMessage::decode(r#"{"type":"screener","data":[{"symbol":"Y"}]}"#).unwrap();
        match msg {
            ServerMessage::Screener(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].symbol(), Some("Y"));
            }
            other => panic!("Expected Screener, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_entry_signal() {
        let msg = ServerMessage::decode(
            r#"{"type":"entry_signal","data":{"symbol":"BTCUSDT","signal":"LONG","price":64000.5,"trend_score":7.8,"signal_strength":88}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), "entry_signal");
        assert!(matches!(msg, ServerMessage::EntrySignal(ref s) if s.symbol == "BTCUSDT"));
    }

    #[test]
    fn test_decode_signal_is_opaque() {
        let msg = ServerMessage::decode(r#"{"type":"signal","data":"anything"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Signal(Value::String("anything".into())));

        let msg = ServerMessage::decode(r#"{"type":"signal"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Signal(Value::Null));
    }

    #[test]
    fn test_decode_unknown_type() {
        let msg = ServerMessage::decode(r#"{"type":"heartbeat","data":{"ts":1}}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown("heartbeat".to_string()));
        assert_eq!(msg.kind(), "heartbeat");
    }

    #[test]
    fn test_decode_invalid_json() {
        let err = ServerMessage::decode("not json").unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn test_decode_missing_type() {
        let err = ServerMessage::decode(r#"{"data":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn test_decode_bad_payload() {
        let err =
            ServerMessage::decode(r#"{"type":"status","data":{"balance":"lots"}}"#).unwrap_err();
        assert_eq!(err.kind(), Some("status"));

        let err = ServerMessage::decode(r#"{"type":"screener","data":{"symbol":"Y"}}"#)
            .unwrap_err();
        assert_eq!(err.kind(), Some("screener"));
    }
}
