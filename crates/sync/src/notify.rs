//! User-facing notifications.
//!
//! A collection reports what the user needs to know (a change that could not
//! be saved, a sign-in requirement) through a [`NotificationSink`]. Delivery
//! is fire-and-forget: nothing waits for the notification to be shown, and
//! correctness never depends on it.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Info,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Somewhere to send notifications.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: String);
}

/// Discards every notification.
impl NotificationSink for () {
    fn notify(&self, _kind: NotificationKind, _message: String) {}
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn notify(&self, kind: NotificationKind, message: String) {
        (**self).notify(kind, message);
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, kind: NotificationKind, message: String) {
        match kind {
            NotificationKind::Success | NotificationKind::Info => {
                tracing::info!(?kind, %message, "Notification");
            }
            NotificationKind::Error => tracing::warn!(%message, "Notification"),
        }
    }
}

/// Forwards notifications over an unbounded channel for a UI layer to drain.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiver its notifications arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, kind: NotificationKind, message: String) {
        // A dropped receiver means nobody is displaying notifications anymore
        if self.tx.send(Notification { kind, message }).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}
