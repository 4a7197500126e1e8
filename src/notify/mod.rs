//! Operator notifications.
//!
//! Delivery channels (chat, mail, push) live outside this crate; the dispatcher only needs
//! somewhere to announce that it is backing off and when it resumes.

use serde::Serialize;

/// A display-oriented notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub display_name: String,
}

impl Message {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }
}

/// Fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    fn send(&self, message: &Message);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &Message) {
        tracing::warn!(title = %message.display_name, "Notification");
    }
}
