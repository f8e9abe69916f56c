//! Error types
//!
//! None of these errors are fatal to the connection manager: decode
//! failures drop a single message and notifier failures fall back to the
//! log.

use std::io;

use thiserror::Error;

/// Errors produced while decoding an inbound message
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Frame is not a JSON object with a string `type` field
    #[error("Malformed message envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// Payload does not match the shape declared by its `type`
    #[error("Invalid '{kind}' payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Message type the error relates to, when known
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            DecodeError::Envelope(_) => None,
            DecodeError::Payload { kind, .. } => Some(*kind),
        }
    }
}

/// Errors raised by a host notifier
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The host cannot show notifications at all
    #[error("Notifications are not supported by this host")]
    Unsupported,

    /// The user has not granted permission
    #[error("Notification permission denied")]
    PermissionDenied,

    /// Writing the notification failed
    #[error("Failed to show notification: {0}")]
    Io(#[from] io::Error),
}
