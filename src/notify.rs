//! Notification channel used to surface toasts to the user.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A mutation went through.
    Success,
    /// The dialog could not proceed with its input.
    Warning,
    /// A load or mutation failed.
    Error,
}

/// Toast emitted by a dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity, drives the toast style.
    pub kind: NotificationKind,
    /// Entity the notification is about (e.g. "Player").
    pub subject: String,
    /// Human readable detail, usually an error message passed through verbatim.
    pub detail: String,
}

/// Fire-and-forget sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    /// Surface a notification; delivery failures are ignored.
    fn notify(&self, kind: NotificationKind, subject: &str, detail: &str);
}

/// Broadcast hub fanning notifications out to every UI subscriber.
///
/// Every notification is also logged, so nothing is lost when no toast area
/// is subscribed.
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl NotificationHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Notifier for NotificationHub {
    fn notify(&self, kind: NotificationKind, subject: &str, detail: &str) {
        match kind {
            NotificationKind::Success => info!(%subject, %detail, "notification"),
            NotificationKind::Warning => warn!(%subject, %detail, "notification"),
            NotificationKind::Error => error!(%subject, %detail, "notification"),
        }

        let _ = self.sender.send(Notification {
            kind,
            subject: subject.to_string(),
            detail: detail.to_string(),
        });
    }
}
