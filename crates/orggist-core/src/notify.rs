//! User-visible notifications.
//!
//! Every error caught at an operation boundary turns into a state transition
//! plus exactly one notification. The sink is injectable so tests can count
//! what the user would have seen.

use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A single user-visible notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Error,
            message: message.into(),
        }
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default sink: routes notifications through `tracing` at the matching level.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotifyLevel::Success | NotifyLevel::Info => info!("{}", notification.message),
            NotifyLevel::Warning => warn!("{}", notification.message),
            NotifyLevel::Error => error!("{}", notification.message),
        }
    }
}

/// Test sink: records every notification for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications recorded so far.
    pub fn recorded(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    /// Count notifications at a given level.
    pub fn count(&self, level: NotifyLevel) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}
