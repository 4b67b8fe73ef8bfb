//! Notification emission
//!
//! The ordering core's only obligation towards notification delivery is
//! to emit `(user, kind, order)` after every successful transition.
//! Delivery itself is another system's job; failures there must never
//! fail an order, so the trait is fire-and-forget by construction.

use async_trait::async_trait;

/// Template kinds emitted by the lifecycle manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderCreated,
    OrderUpdated,
    OrderReceived,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderCreated => "order_created",
            NotificationKind::OrderUpdated => "order_updated",
            NotificationKind::OrderReceived => "order_received",
        }
    }
}

/// Notification collaborator interface
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, kind: NotificationKind, order_id: &str);
}

/// Default notifier: records the emission in the log stream.
///
/// Deployments wire a real transport here; the manager does not care.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, kind: NotificationKind, order_id: &str) {
        tracing::info!(
            user = %user_id,
            kind = kind.as_str(),
            order = %order_id,
            "notification emitted"
        );
    }
}
