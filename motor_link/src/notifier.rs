//! Single-slot transient status messages ("toasts").
//!
//! Exactly one notification is visible at a time. A new one replaces the
//! current one and restarts the dismiss timer. Hosts run the timer and report
//! back with the notification id; a stale id is ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Info => "info",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Generation counter, unique per notifier.
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    /// Epoch ms after which the notification should be gone.
    pub expires_at: u64,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    next_id: u64,
    active: Option<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl Notifier {
    pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            active: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Show `message`, replacing whatever is visible.
    pub fn notify(&mut self, message: impl Into<String>, severity: Severity, now: u64) -> Notification {
        let notification = Notification {
            id: self.next_id,
            message: message.into(),
            severity,
            expires_at: now.saturating_add(self.ttl.as_millis() as u64),
        };
        self.next_id += 1;
        tracing::debug!("notify [{}] {}", severity.as_str(), notification.message);
        self.active = Some(notification.clone());
        notification
    }

    pub fn current(&self) -> Option<&Notification> {
        self.active.as_ref()
    }

    /// Dismiss timer for `id` fired. Returns true if that notification was
    /// still the visible one and is now gone.
    pub fn expire(&mut self, id: u64) -> bool {
        match self.active {
            Some(ref n) if n.id == id => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Poll-style expiry for hosts without per-notification timers.
    pub fn tick(&mut self, now: u64) -> bool {
        match self.active {
            Some(ref n) if now >= n.expires_at => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notification_replaces_current() {
        let mut notifier = Notifier::default();
        let first = notifier.notify("Connected to device", Severity::Success, 1_000);
        let second = notifier.notify("No connection to device", Severity::Warning, 2_000);

        assert_ne!(first.id, second.id);
        assert_eq!(notifier.current(), Some(&second));
        assert_eq!(second.expires_at, 5_000);
    }

    #[test]
    fn test_stale_dismiss_is_ignored() {
        let mut notifier = Notifier::default();
        let first = notifier.notify("one", Severity::Info, 0);
        let second = notifier.notify("two", Severity::Info, 1_000);

        // first's timer fires after it was replaced: second must survive
        assert!(!notifier.expire(first.id));
        assert_eq!(notifier.current().map(|n| n.id), Some(second.id));

        assert!(notifier.expire(second.id));
        assert!(notifier.current().is_none());
    }

    #[test]
    fn test_tick_restarts_with_replacement() {
        let mut notifier = Notifier::new(Duration::from_millis(3000));
        notifier.notify("one", Severity::Info, 0);
        notifier.notify("two", Severity::Info, 2_000);

        assert!(!notifier.tick(3_500));
        assert!(notifier.tick(5_000));
        assert!(notifier.current().is_none());
    }
}
