//! Transient user notifications (toasts)

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Danger,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Danger)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }
}

/// Single-slot notification channel.
///
/// A new notification replaces the visible one; it is dismissed once
/// `ttl_ms` has elapsed since it was shown.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    ttl_ms: u64,
    current: Option<(Notification, u64)>,
    /// Count of notifications ever pushed; lets tests and the page detect
    /// a repeat of an identical message
    sequence: u64,
}

impl NotificationChannel {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            current: None,
            sequence: 0,
        }
    }

    pub fn push(&mut self, notification: Notification, now_ms: u64) {
        tracing::debug!(
            severity = ?notification.severity,
            message = %notification.message,
            "notification"
        );
        self.current = Some((notification, now_ms));
        self.sequence += 1;
    }

    /// Dismiss the current notification if it has expired
    pub fn tick(&mut self, now_ms: u64) {
        if let Some((_, shown_at)) = &self.current {
            if now_ms.saturating_sub(*shown_at) >= self.ttl_ms {
                self.current = None;
            }
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref().map(|(n, _)| n)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}
