//! Outbound notifications.
//!
//! The engine only ever calls [`Notifier::notify`]; display, timing and
//! dismissal belong to whichever collaborator is injected.

pub mod toast;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use toast::{Toast, ToastId, ToastQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl Notification {
    pub fn new(message: impl Into<String>, level: NotificationLevel, duration: Duration) -> Self {
        Self {
            message: message.into(),
            level,
            duration,
        }
    }
}

/// Fire-and-forget sink for user-facing messages.
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

/// Keeps every notification in order of arrival.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Vec<Notification>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[Notification] {
        &self.sent
    }

    pub fn take(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.sent)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notification: Notification) {
        self.sent.push(notification);
    }
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn notify(&mut self, notification: Notification) {
        (**self).notify(notification);
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let mut sink = RecordingNotifier::new();
        sink.notify(Notification::new("a", NotificationLevel::Success, Duration::from_secs(3)));
        sink.notify(Notification::new("b", NotificationLevel::Info, Duration::from_secs(3)));
        let messages: Vec<_> = sink.sent().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, ["a", "b"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn duration_serializes_in_milliseconds() {
        let note = Notification::new("x", NotificationLevel::Error, Duration::from_millis(3000));
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["duration"], 3000);
        assert_eq!(json["level"], "error");
    }
}
