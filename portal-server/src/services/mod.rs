//! Service Collaborators
//!
//! Seams for concerns that live outside the ordering core. Delivery
//! transports (push, polling, SMS) plug in behind [`Notifier`].

pub mod notify;

pub use notify::{LogNotifier, NotificationKind, Notifier};
