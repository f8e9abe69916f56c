//! tradewire Core Library
//!
//! This crate keeps a client in sync with a live trading data server:
//! one persistent WebSocket connection, decoded into shared observable
//! state, with automatic reconnection.
//!
//! # Architecture
//!
//! - **Registry**: observable slots holding the latest balance, positions,
//!   screener snapshot and connection status
//! - **ConnectionManager**: owns the connection, dispatches messages into
//!   the registry and reconnects after a fixed delay
//! - **AlertCenter**: surfaces entry signals to the user
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let registry = Registry::new();
//! let _sub = registry.balance.subscribe(|b| println!("balance: {b}"));
//!
//! let alerts = AlertCenter::headless();
//! let (manager, events) =
//!     ConnectionManager::websocket(ManagerConfig::from(&config), registry.clone(), alerts);
//! let handle = manager.spawn(events);
//! ```
//!
//! # Modules
//!
//! - `registry`: Observable state slots
//! - `sync`: Connection manager, transport and message dispatch
//! - `alert`: Entry alerts and the host notifier capability
//! - `models`: Payload and record types
//! - `config`: Application configuration
//! - `error`: Error types

pub mod alert;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod sync;

pub use alert::{Alert, AlertCenter, HeadlessNotifier, Notifier, Permission};
pub use config::Config;
pub use error::{DecodeError, NotifyError};
pub use models::{ConnectionStatus, EntrySignal, Position, ScreenerEntry, StatusUpdate};
pub use registry::{Registry, Slot, Subscription};
pub use sync::{ConnectionManager, ManagerConfig, ManagerHandle, ManagerState};
