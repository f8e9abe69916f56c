//! Entry alerts
//!
//! `entry_signal` messages bypass the registry and are surfaced directly
//! to the user. Every alert is logged; when the host grants notification
//! permission it is also raised through the host's [`Notifier`].
//!
//! Alerts are keyed by symbol: a second alert for a symbol replaces the
//! first rather than stacking, and each alert expires after its timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::NotifyError;
use crate::models::EntrySignal;

/// Default auto-dismiss timeout
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification permission as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user has not decided yet
    Default,
    Granted,
    Denied,
}

/// A user-facing alert built from an entry signal
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Replacement key; alerts with the same tag replace each other
    pub tag: String,
    pub title: String,
    pub body: String,
    /// One-line form used for the log
    pub summary: String,
    /// Auto-dismiss after this long
    pub timeout: Duration,
    /// Bring the host application to the foreground when clicked
    pub focus_on_click: bool,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn from_signal(signal: &EntrySignal, timeout: Duration) -> Self {
        Self {
            tag: signal.symbol.clone(),
            title: format!("{} {}", signal.signal, signal.symbol),
            body: format!(
                "Entry NOW @ ${}\nTrend: {:.1} | Strength: {:.0}%",
                signal.price, signal.trend_score, signal.signal_strength
            ),
            summary: format!(
                "{} ENTRY: {} @ ${}",
                signal.signal, signal.symbol, signal.price
            ),
            timeout,
            focus_on_click: true,
            raised_at: Utc::now(),
        }
    }
}

/// Host capability for raising OS-level notifications
pub trait Notifier: Send + Sync {
    /// Current permission, without prompting
    fn permission(&self) -> Permission;

    /// Ask the user for permission
    fn request_permission(&self) -> Permission;

    /// Show an alert
    ///
    /// Implementations replace any displayed alert with the same tag,
    /// dismiss it after `alert.timeout`, and focus the host when the user
    /// interacts with it if `alert.focus_on_click` is set.
    fn show(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Notifier for hosts without a notification surface
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessNotifier;

impl Notifier for HeadlessNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    fn show(&self, _alert: &Alert) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported)
    }
}

/// Raises alerts and tracks which symbols currently have one showing
pub struct AlertCenter {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    enabled: bool,
    /// Settled permission; `Default` is never cached
    permission: Option<Permission>,
    /// Symbol -> expiry of its active alert
    active: HashMap<String, Instant>,
}

impl AlertCenter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            timeout: DEFAULT_ALERT_TIMEOUT,
            enabled: true,
            permission: None,
            active: HashMap::new(),
        }
    }

    /// Alerts that only reach the log
    pub fn headless() -> Self {
        Self::new(Arc::new(HeadlessNotifier))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable OS-level notifications entirely
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Resolve notification permission, prompting at most until settled
    ///
    /// Once the host reports `Granted` or `Denied` the answer is cached and
    /// later calls return it without touching the host.
    pub fn ensure_permission(&mut self) -> Permission {
        if !self.enabled {
            return Permission::Denied;
        }
        if let Some(permission) = self.permission {
            return permission;
        }

        let permission = match self.notifier.permission() {
            Permission::Default => {
                debug!("Requesting notification permission");
                self.notifier.request_permission()
            }
            settled => settled,
        };

        if permission != Permission::Default {
            info!("Notification permission: {:?}", permission);
            self.permission = Some(permission);
        }
        permission
    }

    /// Raise an alert for an entry signal
    ///
    /// The alert is always logged. Notifier failures are logged and
    /// otherwise ignored.
    pub fn raise(&mut self, signal: &EntrySignal) -> Alert {
        let alert = Alert::from_signal(signal, self.timeout);
        warn!(symbol = %alert.tag, "{}", alert.summary);

        self.prune();

        if self.ensure_permission() == Permission::Granted {
            match self.notifier.show(&alert) {
                Ok(()) => {
                    let replaced = self
                        .active
                        .insert(alert.tag.clone(), Instant::now() + alert.timeout)
                        .is_some();
                    debug!(symbol = %alert.tag, replaced, "Notification shown");
                }
                Err(e) => warn!(symbol = %alert.tag, "Notification failed: {}", e),
            }
        }

        alert
    }

    /// Whether a notification for `symbol` is still showing
    pub fn is_active(&self, symbol: &str) -> bool {
        self.active
            .get(symbol)
            .is_some_and(|expires| *expires > Instant::now())
    }

    /// Number of notifications still showing
    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        self.active.values().filter(|expires| **expires > now).count()
    }

    fn prune(&mut self) {
        let now = Instant::now();
        self.active.retain(|_, expires| *expires > now);
    }
}

impl std::fmt::Debug for AlertCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertCenter")
            .field("timeout", &self.timeout)
            .field("enabled", &self.enabled)
            .field("permission", &self.permission)
            .field("active", &self.active.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Notifier that records what it was asked to do
    pub(crate) struct RecordingNotifier {
        pub initial: Permission,
        pub answer: Permission,
        pub requests: Mutex<u32>,
        pub shown: Mutex<Vec<Alert>>,
    }

    impl RecordingNotifier {
        pub(crate) fn new(initial: Permission, answer: Permission) -> Arc<Self> {
            Arc::new(Self {
                initial,
                answer,
                requests: Mutex::new(0),
                shown: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn granted() -> Arc<Self> {
            Self::new(Permission::Granted, Permission::Granted)
        }
    }

    impl Notifier for RecordingNotifier {
        fn permission(&self) -> Permission {
            self.initial
        }

        fn request_permission(&self) -> Permission {
            *self.requests.lock().unwrap() += 1;
            self.answer
        }

        fn show(&self, alert: &Alert) -> Result<(), NotifyError> {
            self.shown.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    pub(crate) fn signal(symbol: &str) -> EntrySignal {
        EntrySignal {
            symbol: symbol.to_string(),
            signal: "LONG".to_string(),
            price: 64000.5,
            trend_score: 7.84,
            signal_strength: 88.6,
        }
    }

    #[test]
    fn test_alert_formatting() {
        let alert = Alert::from_signal(&signal("BTCUSDT"), DEFAULT_ALERT_TIMEOUT);
        assert_eq!(alert.tag, "BTCUSDT");
        assert_eq!(alert.title, "LONG BTCUSDT");
        assert_eq!(alert.body, "Entry NOW @ $64000.5\nTrend: 7.8 | Strength: 89%");
        assert_eq!(alert.summary, "LONG ENTRY: BTCUSDT @ $64000.5");
        assert_eq!(alert.timeout, Duration::from_secs(10));
        assert!(alert.focus_on_click);
    }

    #[test]
    fn test_headless_only_logs() {
        let mut center = AlertCenter::headless();
        let alert = center.raise(&signal("ETHUSDT"));
        assert_eq!(alert.tag, "ETHUSDT");
        assert_eq!(center.active_count(), 0);
        assert_eq!(center.ensure_permission(), Permission::Denied);
    }

    #[tokio::test]
    async fn test_permission_requested_once() {
        let notifier = RecordingNotifier::new(Permission::Default, Permission::Granted);
        let mut center = AlertCenter::new(notifier.clone());

        assert_eq!(center.ensure_permission(), Permission::Granted);
        assert_eq!(center.ensure_permission(), Permission::Granted);
        center.raise(&signal("BTCUSDT"));
        assert_eq!(*notifier.requests.lock().unwrap(), 1);
    }

    #[test]
    fn test_settled_permission_never_prompts() {
        let notifier = RecordingNotifier::new(Permission::Denied, Permission::Granted);
        let mut center = AlertCenter::new(notifier.clone());

        assert_eq!(center.ensure_permission(), Permission::Denied);
        center.raise(&signal("BTCUSDT"));
        assert_eq!(*notifier.requests.lock().unwrap(), 0);
        assert!(notifier.shown.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dismissed_prompt_asks_again() {
        let notifier = RecordingNotifier::new(Permission::Default, Permission::Default);
        let mut center = AlertCenter::new(notifier.clone());

        assert_eq!(center.ensure_permission(), Permission::Default);
        assert_eq!(center.ensure_permission(), Permission::Default);
        assert_eq!(*notifier.requests.lock().unwrap(), 2);
    }

    #[test]
    fn test_disabled_notifications() {
        let notifier = RecordingNotifier::granted();
        let mut center = AlertCenter::new(notifier.clone()).with_notifications(false);

        center.raise(&signal("BTCUSDT"));
        assert!(notifier.shown.lock().unwrap().is_empty());
        assert_eq!(center.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_symbol_replaces() {
        let notifier = RecordingNotifier::granted();
        let mut center = AlertCenter::new(notifier.clone());

        center.raise(&signal("BTCUSDT"));
        center.raise(&signal("BTCUSDT"));
        assert_eq!(center.active_count(), 1);

        center.raise(&signal("ETHUSDT"));
        assert_eq!(center.active_count(), 2);

        let shown = notifier.shown.lock().unwrap();
        assert_eq!(shown.len(), 3);
        assert_eq!(shown[0].tag, shown[1].tag);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_expires() {
        let mut center = AlertCenter::new(RecordingNotifier::granted());

        center.raise(&signal("BTCUSDT"));
        assert!(center.is_active("BTCUSDT"));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(center.is_active("BTCUSDT"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!center.is_active("BTCUSDT"));
        assert_eq!(center.active_count(), 0);
    }
}
