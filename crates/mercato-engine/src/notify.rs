//! # Notifications
//!
//! Outbound messages to customers and staff: order confirmations, payment
//! review results, redemption receipts. The engine only decides *that* a
//! notification should go out and to whom; delivery (email, webhook, UI
//! toast) is the sink implementor's problem.
//!
//! Like audit sinks, notification sinks are fire-and-forget. A failed
//! delivery never fails the operation that triggered it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    /// A single user, by principal id.
    User(String),
    /// All back-office staff.
    Admins,
}

/// A message the engine wants delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub title: String,
    pub body: String,
    /// Order this notification is about, when there is one.
    pub order_id: Option<String>,
}

impl Notification {
    pub fn for_user(
        user_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Notification {
            recipient: Recipient::User(user_id.into()),
            title: title.into(),
            body: body.into(),
            order_id: None,
        }
    }

    pub fn for_admins(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification {
            recipient: Recipient::Admins,
            title: title.into(),
            body: body.into(),
            order_id: None,
        }
    }

    pub fn about_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }
}

/// Destination for notifications.
pub trait NotificationSink: Send + Sync {
    /// Hands off one notification. Must not block and must not fail the caller.
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the tracing log. The default sink.
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        info!(
            target: "mercato::notify",
            recipient = ?notification.recipient,
            title = %notification.title,
            order_id = ?notification.order_id,
            "notification"
        );
    }
}

/// Forwards notifications over a bounded channel for a real delivery worker.
pub struct ChannelNotificationSink {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotificationSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelNotificationSink { tx }, rx)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.tx.try_send(notification) {
            warn!(error = %err, "notification channel full, message dropped");
        }
    }
}
