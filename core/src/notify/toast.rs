use std::time::{Duration, Instant};

use crate::notify::{Notification, NotificationLevel, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(pub u64);

/// A visible notification and the moment it dismisses itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub level: NotificationLevel,
    pub deadline: Instant,
}

/// Self-dismissing notification stack.
///
/// Each toast's timer is its deadline entry, so removing a toast early also
/// cancels the timer: a dismissed toast can never expire a second time.
#[derive(Debug)]
pub struct ToastQueue {
    next_id: u64,
    active: Vec<Toast>,
    clock: fn() -> Instant,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::with_clock(Instant::now)
    }
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: fn() -> Instant) -> Self {
        Self {
            next_id: 0,
            active: Vec::new(),
            clock,
        }
    }

    pub fn push(&mut self, notification: Notification, now: Instant) -> ToastId {
        self.next_id += 1;
        let id = ToastId(self.next_id);
        self.active.push(Toast {
            id,
            message: notification.message,
            level: notification.level,
            deadline: now + notification.duration,
        });
        id
    }

    /// Removes a toast before its deadline. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.active.len();
        self.active.retain(|toast| toast.id != id);
        self.active.len() != before
    }

    /// Drops every toast whose deadline has passed and returns their ids.
    pub fn expire(&mut self, now: Instant) -> Vec<ToastId> {
        let mut expired = Vec::new();
        self.active.retain(|toast| {
            if toast.deadline <= now {
                expired.push(toast.id);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn active(&self) -> &[Toast] {
        &self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Time until the earliest deadline, if any toast is showing.
    pub fn next_deadline_in(&self, now: Instant) -> Option<Duration> {
        self.active
            .iter()
            .map(|toast| toast.deadline.saturating_duration_since(now))
            .min()
    }
}

impl Notifier for ToastQueue {
    fn notify(&mut self, notification: Notification) {
        let now = (self.clock)();
        self.push(notification, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn note(message: &str, millis: u64) -> Notification {
        Notification::new(message, NotificationLevel::Info, Duration::from_millis(millis))
    }

    #[test]
    fn toasts_expire_at_their_deadline() {
        let start = Instant::now();
        let mut queue = ToastQueue::new();
        let short = queue.push(note("short", 1000), start);
        let long = queue.push(note("long", 3000), start);

        assert!(queue.expire(start + Duration::from_millis(999)).is_empty());
        assert_eq!(queue.expire(start + Duration::from_millis(1000)), vec![short]);
        assert_eq!(queue.active().len(), 1);
        assert_eq!(queue.active()[0].id, long);
        assert_eq!(
            queue.next_deadline_in(start + Duration::from_millis(1000)),
            Some(Duration::from_millis(2000))
        );
    }

    #[test]
    fn early_dismissal_cancels_the_timer() {
        let start = Instant::now();
        let mut queue = ToastQueue::new();
        let id = queue.push(note("bye", 3000), start);
        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));
        assert!(queue.expire(start + Duration::from_secs(10)).is_empty());
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline_in(start), None);
    }

    fn fixed_now() -> Instant {
        static NOW: OnceLock<Instant> = OnceLock::new();
        *NOW.get_or_init(Instant::now)
    }

    #[test]
    fn notifier_uses_injected_clock() {
        let mut queue = ToastQueue::with_clock(fixed_now);
        queue.notify(note("hello", 3000));
        let toast = &queue.active()[0];
        assert_eq!(toast.message, "hello");
        assert_eq!(toast.id, ToastId(1));
        assert_eq!(toast.deadline, fixed_now() + Duration::from_millis(3000));
        assert!(queue.expire(fixed_now() + Duration::from_millis(2999)).is_empty());
        assert_eq!(
            queue.expire(fixed_now() + Duration::from_millis(3000)),
            vec![ToastId(1)]
        );
    }
}
