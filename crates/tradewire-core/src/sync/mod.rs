//! Live connection to the data server
//!
//! Keeps one WebSocket connection open, applies inbound messages to the
//! [`Registry`](crate::Registry) and reconnects after a fixed delay
//! whenever the connection drops.
//!
//! ## Protocol
//!
//! The server sends JSON text frames `{"type": ..., "data": ...}`:
//! 1. `status` - balance, open position count and positions
//! 2. `screener` - full screener snapshot
//! 3. `entry_signal` - raised as an alert
//! 4. `signal` - informational, logged only
//!
//! ## Usage
//!
//! ```ignore
//! let registry = Registry::new();
//! let (manager, events) =
//!     ConnectionManager::websocket(ManagerConfig::default(), registry.clone(), AlertCenter::headless());
//! let handle = manager.spawn(events);
//! // ...
//! handle.shutdown().await?;
//! ```

mod dispatch;
mod manager;
mod message;
mod transport;

pub use dispatch::{dispatch, dispatch_text};
pub use manager::{ConnectionManager, ManagerConfig, ManagerHandle, ManagerState};
pub use message::ServerMessage;
pub use transport::{
    AttemptId, Connection, ConnectionEvent, Connector, EventReceiver, EventSender, TimerId,
    WsConnection, WsConnector,
};
