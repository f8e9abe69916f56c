//! Connection manager
//!
//! Owns the single live connection, applies inbound messages to the
//! registry and drives reconnection with a fixed delay.
//!
//! All transitions happen on one task that drains a single event queue.
//! Transport tasks, the reconnect timer and the host's [`ManagerHandle`]
//! only ever enqueue [`ConnectionEvent`]s, so at most one transition runs
//! at a time and the state needs no locking.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──opened──▶ Connected
//!                      ▲   │                   │
//!                timer │   └──────closed───────┤
//!                      │                       ▼
//!                      └──────────────── Disconnected
//!
//! any state ──disconnect──▶ TornDown
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::dispatch::dispatch_text;
use super::transport::{
    AttemptId, Connection, ConnectionEvent, Connector, EventReceiver, EventSender, TimerId,
    WsConnector,
};
use crate::alert::AlertCenter;
use crate::config::{Config, DEFAULT_URL};
use crate::models::ConnectionStatus;
use crate::registry::Registry;

/// Lifecycle state of the connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Created, no attempt made yet
    Idle,
    /// An attempt is in progress
    Connecting,
    /// Connection open
    Connected,
    /// Connection lost, reconnect scheduled
    Disconnected,
    /// Explicitly torn down; terminal
    TornDown,
}

/// Configuration for the connection manager
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// WebSocket URL
    pub url: String,
    /// Fixed delay before each reconnect
    pub reconnect_delay: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

impl From<&Config> for ManagerConfig {
    fn from(config: &Config) -> Self {
        Self {
            url: config.url.clone(),
            reconnect_delay: config.reconnect_delay(),
        }
    }
}

struct ReconnectTimer {
    id: TimerId,
    task: JoinHandle<()>,
}

/// Maintains one connection to the data server
pub struct ConnectionManager<C: Connector = WsConnector> {
    config: ManagerConfig,
    client_id: String,
    connector: C,
    registry: Registry,
    alerts: AlertCenter,
    state: ManagerState,
    state_tx: watch::Sender<ManagerState>,
    live: Option<C::Connection>,
    reconnect: Option<ReconnectTimer>,
    in_flight: bool,
    attempt: AttemptId,
    next_timer: TimerId,
    events_tx: EventSender,
}

impl ConnectionManager<WsConnector> {
    /// Create a manager that connects over WebSocket
    pub fn websocket(
        config: ManagerConfig,
        registry: Registry,
        alerts: AlertCenter,
    ) -> (Self, EventReceiver) {
        Self::new(config, WsConnector, registry, alerts)
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager in the `Idle` state
    ///
    /// Returns the receiving end of the manager's event queue, to be passed
    /// to [`run`](Self::run) or [`spawn`](Self::spawn).
    pub fn new(
        config: ManagerConfig,
        connector: C,
        registry: Registry,
        alerts: AlertCenter,
    ) -> (Self, EventReceiver) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ManagerState::Idle);
        let client_id = format!("tradewire-{}", &uuid::Uuid::new_v4().to_string()[..8]);

        let manager = Self {
            config,
            client_id,
            connector,
            registry,
            alerts,
            state: ManagerState::Idle,
            state_tx,
            live: None,
            reconnect: None,
            in_flight: false,
            attempt: 0,
            next_timer: 0,
            events_tx,
        };

        (manager, events_rx)
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Subscribe to lifecycle state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ManagerState> {
        self.state_tx.subscribe()
    }

    /// True while an attempt has started and neither opened nor failed
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn has_connection(&self) -> bool {
        self.live.is_some()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Id of the most recent connection attempt (0 before the first)
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    /// Start a connection attempt
    ///
    /// Does nothing while connecting or connected, and after teardown.
    pub fn connect(&mut self) {
        match self.state {
            ManagerState::Connecting | ManagerState::Connected => {
                debug!("Already connected or connecting");
                return;
            }
            ManagerState::TornDown => {
                warn!("Connection manager was torn down, ignoring connect");
                return;
            }
            ManagerState::Idle | ManagerState::Disconnected => {}
        }

        // An explicit connect makes any scheduled one redundant
        self.cancel_reconnect();

        self.attempt += 1;
        let attempt = self.attempt;
        self.in_flight = true;
        self.set_state(ManagerState::Connecting);
        self.registry
            .connection_status
            .set(ConnectionStatus::Connecting);

        info!(attempt, client = %self.client_id, "Connecting to {}", self.config.url);
        let connection = self
            .connector
            .connect(&self.config.url, attempt, self.events_tx.clone());
        self.live = Some(connection);
    }

    /// Tear down: cancel any pending reconnect and close the connection
    ///
    /// No automatic reconnection happens afterwards.
    pub fn disconnect(&mut self) {
        if self.state == ManagerState::TornDown {
            return;
        }

        self.cancel_reconnect();
        if let Some(mut connection) = self.live.take() {
            connection.close();
        }
        self.in_flight = false;

        // The Closed event for the live socket is discarded once torn down,
        // so the final status is written here instead.
        if self.registry.connection_status.get() != ConnectionStatus::Disconnected {
            self.registry
                .connection_status
                .set(ConnectionStatus::Disconnected);
        }
        self.set_state(ManagerState::TornDown);
        info!(client = %self.client_id, "Connection manager torn down");
    }

    /// Apply one event
    pub fn handle(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { attempt } if self.is_current(attempt) => self.on_open(),
            ConnectionEvent::Message { attempt, text } if self.is_current(attempt) => {
                if self.state == ManagerState::Connected {
                    dispatch_text(&text, &self.registry, &mut self.alerts);
                }
            }
            ConnectionEvent::Failed { attempt, error } if self.is_current(attempt) => {
                self.on_error(&error)
            }
            ConnectionEvent::Closed { attempt } if self.is_current(attempt) => self.on_close(),
            ConnectionEvent::ReconnectDue { timer } => self.on_timer(timer),
            ConnectionEvent::Connect => self.connect(),
            ConnectionEvent::Teardown => self.disconnect(),
            stale => debug!("Ignoring event from a previous connection: {:?}", stale),
        }
    }

    /// Drain the event queue until teardown
    pub async fn run(mut self, mut events: EventReceiver) {
        while self.state != ManagerState::TornDown {
            let Some(event) = events.recv().await else {
                break;
            };
            self.handle(event);
        }
        debug!(client = %self.client_id, "Connection manager stopped");
    }

    /// Connect immediately and run on a background task
    pub fn spawn(mut self, events: EventReceiver) -> ManagerHandle {
        let handle_tx = self.events_tx.clone();
        let state_rx = self.subscribe_state();

        self.connect();
        let task = tokio::spawn(self.run(events));

        ManagerHandle {
            events_tx: handle_tx,
            state_rx,
            task,
        }
    }

    fn is_current(&self, attempt: AttemptId) -> bool {
        attempt == self.attempt
            && !matches!(self.state, ManagerState::Idle | ManagerState::TornDown)
    }

    fn on_open(&mut self) {
        if self.state != ManagerState::Connecting {
            return;
        }
        info!(attempt = self.attempt, "Connected to {}", self.config.url);
        self.in_flight = false;
        self.registry
            .connection_status
            .set(ConnectionStatus::Connected);
        self.set_state(ManagerState::Connected);
    }

    fn on_error(&mut self, error: &str) {
        warn!(attempt = self.attempt, "Connection error: {}", error);
        self.in_flight = false;
        self.registry.connection_status.set(ConnectionStatus::Error);
    }

    fn on_close(&mut self) {
        info!(
            attempt = self.attempt,
            "Connection closed. Reconnecting in {:?}", self.config.reconnect_delay
        );
        self.live = None;
        self.in_flight = false;
        self.registry
            .connection_status
            .set(ConnectionStatus::Disconnected);
        self.set_state(ManagerState::Disconnected);

        if self.reconnect.is_none() {
            self.schedule_reconnect();
        }
    }

    fn on_timer(&mut self, timer: TimerId) {
        match &self.reconnect {
            Some(pending) if pending.id == timer => {
                self.reconnect = None;
                self.connect();
            }
            _ => debug!(timer, "Ignoring stale reconnect timer"),
        }
    }

    fn schedule_reconnect(&mut self) {
        self.next_timer += 1;
        let id = self.next_timer;
        let delay = self.config.reconnect_delay;
        let events = self.events_tx.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ConnectionEvent::ReconnectDue { timer: id });
        });

        self.reconnect = Some(ReconnectTimer { id, task });
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            debug!(timer = timer.id, "Cancelling pending reconnect");
            timer.task.abort();
        }
    }

    fn set_state(&mut self, state: ManagerState) {
        self.state = state;
        let _ = self.state_tx.send(state);
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.cancel_reconnect();
        if let Some(mut connection) = self.live.take() {
            connection.close();
        }
    }
}

/// Host-side handle to a spawned [`ConnectionManager`]
pub struct ManagerHandle {
    events_tx: EventSender,
    state_rx: watch::Receiver<ManagerState>,
    task: JoinHandle<()>,
}

impl ManagerHandle {
    /// Ask the manager to connect (no-op if already connecting or connected)
    pub fn connect(&self) {
        let _ = self.events_tx.send(ConnectionEvent::Connect);
    }

    /// Ask the manager to tear down
    pub fn disconnect(&self) {
        let _ = self.events_tx.send(ConnectionEvent::Teardown);
    }

    pub fn state(&self) -> ManagerState {
        *self.state_rx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ManagerState> {
        self.state_rx.clone()
    }

    /// Tear down and wait for the manager task to finish
    pub async fn shutdown(self) -> Result<()> {
        self.disconnect();
        self.task.await.context("Connection manager task failed")
    }
}
