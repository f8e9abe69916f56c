//! Terminal notifications
//!
//! Raises entry alerts on stderr with a bell. Only available when stderr
//! is a terminal; piped or redirected runs fall back to log-only alerts.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use tradewire_core::{Alert, Notifier, NotifyError, Permission};

/// Notifier that writes alerts to the terminal
pub struct TerminalNotifier {
    interactive: bool,
    /// Tag -> when its alert expires
    shown: Mutex<HashMap<String, Instant>>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self {
            interactive: atty::is(atty::Stream::Stderr),
            shown: Mutex::new(HashMap::new()),
        }
    }

    /// Record `alert` as showing; returns true if it replaces a live one
    fn track(&self, alert: &Alert, now: Instant) -> bool {
        let mut shown = self.shown.lock().unwrap_or_else(|e| e.into_inner());
        shown.retain(|_, expires| *expires > now);
        shown
            .insert(alert.tag.clone(), now + alert.timeout)
            .is_some()
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        if self.interactive {
            Permission::Default
        } else {
            Permission::Denied
        }
    }

    /// Running interactively is taken as consent
    fn request_permission(&self) -> Permission {
        if self.interactive {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn show(&self, alert: &Alert) -> Result<(), NotifyError> {
        if !self.interactive {
            return Err(NotifyError::Unsupported);
        }

        let replaced = self.track(alert, Instant::now());
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(render(alert, replaced).as_bytes())?;
        stderr.flush()?;
        Ok(())
    }
}

/// Bell, then a boxed alert
fn render(alert: &Alert, replaced: bool) -> String {
    let marker = if replaced { " (updated)" } else { "" };
    let mut out = format!(
        "\x07\n┌ 🎯 {}{} · {}\n",
        alert.title,
        marker,
        alert.raised_at.format("%H:%M:%S")
    );
    for line in alert.body.lines() {
        out.push_str(&format!("│ {}\n", line));
    }
    out.push_str(&format!("└ expires in {}s\n", alert.timeout.as_secs()));
    out
}
