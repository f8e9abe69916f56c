//! Connection transport
//!
//! A [`Connector`] opens connections and reports their lifecycle as
//! [`ConnectionEvent`]s on the manager's event queue. It never touches
//! manager state directly, which keeps every transition on the manager's
//! own task.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Identifies one connection attempt
pub type AttemptId = u64;

/// Identifies one scheduled reconnect
pub type TimerId = u64;

/// Everything the connection manager reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection for `attempt` is open
    Opened { attempt: AttemptId },
    /// A text frame arrived
    Message { attempt: AttemptId, text: String },
    /// The transport reported an error; a `Closed` follows
    Failed { attempt: AttemptId, error: String },
    /// The connection for `attempt` is gone
    Closed { attempt: AttemptId },
    /// A scheduled reconnect is due
    ReconnectDue { timer: TimerId },
    /// Host asked for a connection
    Connect,
    /// Host asked for teardown
    Teardown,
}

pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ConnectionEvent>;

/// A live connection owned by the manager
pub trait Connection: Send {
    /// Close the connection, or abandon the attempt if it is still opening
    ///
    /// No further events are expected after this call.
    fn close(&mut self);
}

/// Opens connections
pub trait Connector: Send + 'static {
    type Connection: Connection + 'static;

    /// Start opening a connection to `url`
    ///
    /// Returns immediately. The outcome is reported on `events`, tagged
    /// with `attempt`: `Opened` then any number of `Message`s, and finally
    /// `Closed`, preceded by `Failed` when the cause was an error.
    fn connect(&mut self, url: &str, attempt: AttemptId, events: EventSender) -> Self::Connection;
}

/// WebSocket connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

/// Handle to a connection task started by [`WsConnector`]
#[derive(Debug)]
pub struct WsConnection {
    close_tx: Option<oneshot::Sender<()>>,
}

impl Connection for WsConnection {
    fn close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Connector for WsConnector {
    type Connection = WsConnection;

    fn connect(&mut self, url: &str, attempt: AttemptId, events: EventSender) -> WsConnection {
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(connection_task(url.to_string(), attempt, events, close_rx));
        WsConnection {
            close_tx: Some(close_tx),
        }
    }
}

/// Run one connection until it closes or the manager closes it
///
/// Dropping the [`WsConnection`] handle counts as a close request.
async fn connection_task(
    url: String,
    attempt: AttemptId,
    events: EventSender,
    mut close_rx: oneshot::Receiver<()>,
) {
    debug!(attempt, "Connecting to {}", url);

    let connected = tokio::select! {
        result = connect_async(&url) => result,
        _ = &mut close_rx => {
            debug!(attempt, "Connection attempt abandoned");
            return;
        }
    };

    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            warn!(attempt, "WebSocket connection to {} failed: {}", url, e);
            let _ = events.send(ConnectionEvent::Failed {
                attempt,
                error: e.to_string(),
            });
            let _ = events.send(ConnectionEvent::Closed { attempt });
            return;
        }
    };

    let _ = events.send(ConnectionEvent::Opened { attempt });
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                debug!(attempt, "Closing connection");
                write.close().await.ok();
                return;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(ConnectionEvent::Message { attempt, text });
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(attempt, "Ignoring binary frame ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = events.send(ConnectionEvent::Closed { attempt });
                        return;
                    }
                    Some(Err(e)) => {
                        warn!(attempt, "WebSocket error: {}", e);
                        let _ = events.send(ConnectionEvent::Failed {
                            attempt,
                            error: e.to_string(),
                        });
                        let _ = events.send(ConnectionEvent::Closed { attempt });
                        return;
                    }
                    // Ping/pong are answered by tungstenite
                    _ => {}
                }
            }
        }
    }
}
