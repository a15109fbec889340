use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::debug;
use uuid::Uuid;

// Consumers only need the latest few signals, older ones carry no extra info.
const OBSERVER_QUEUE_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    DataRefreshed,
    BadgeStateChanged(bool),
}

pub type ObserverId = Uuid;

/// Registry of observers currently interested in cache changes. Delivery is
/// fire-and-forget: observers that went away are pruned, observers that do not
/// keep up miss messages and pick up fresh data on their next lookup.
#[derive(Default)]
pub struct Notifier {
    observers: Mutex<HashMap<ObserverId, Sender<Notification>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Notifier::default()
    }

    pub fn subscribe(&self) -> (ObserverId, Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(OBSERVER_QUEUE_CAPACITY);
        let id = Uuid::new_v4();
        if let Ok(mut observers) = self.observers.lock() {
            observers.insert(id, tx);
        }
        debug!(observer = %id, "Observer registered");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: &ObserverId) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.remove(id);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().map(|o| o.len()).unwrap_or_default()
    }

    pub fn notify_refreshed(&self) -> usize {
        self.publish(Notification::DataRefreshed)
    }

    pub fn notify_badge_state(&self, enabled: bool) -> usize {
        self.publish(Notification::BadgeStateChanged(enabled))
    }

    /// Returns how many observers the message was handed to.
    fn publish(&self, notification: Notification) -> usize {
        let Ok(mut observers) = self.observers.lock() else {
            return 0;
        };

        let mut delivered = 0;
        observers.retain(|id, tx| match tx.try_send(notification) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(observer = %id, "Observer queue full, dropping {:?}", notification);
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(observer = %id, "Observer gone, pruning");
                false
            }
        });
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fan_out_reaches_every_observer() {
        let notifier = Notifier::new();
        let (_, mut first) = notifier.subscribe();
        let (_, mut second) = notifier.subscribe();

        assert_eq!(notifier.notify_refreshed(), 2);
        assert_eq!(first.recv().await, Some(Notification::DataRefreshed));
        assert_eq!(second.recv().await, Some(Notification::DataRefreshed));

        assert_eq!(notifier.notify_badge_state(false), 2);
        assert_eq!(first.recv().await, Some(Notification::BadgeStateChanged(false)));
    }

    #[tokio::test]
    async fn test_closed_observers_are_pruned() {
        let notifier = Notifier::new();
        let (_, live) = notifier.subscribe();
        let (_, closed) = notifier.subscribe();
        drop(closed);

        assert_eq!(notifier.notify_refreshed(), 1);
        assert_eq!(notifier.observer_count(), 1);
        drop(live);
    }

    #[tokio::test]
    async fn test_slow_observer_does_not_block() {
        let notifier = Notifier::new();
        let (_, mut slow) = notifier.subscribe();

        for _ in 0..OBSERVER_QUEUE_CAPACITY + 3 {
            notifier.notify_refreshed();
        }
        // Still registered, only the overflow was dropped.
        assert_eq!(notifier.observer_count(), 1);
        let mut received = 0;
        while slow.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, OBSERVER_QUEUE_CAPACITY);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = Notifier::new();
        let (id, _rx) = notifier.subscribe();
        notifier.unsubscribe(&id);
        assert_eq!(notifier.notify_refreshed(), 0);
    }
}
