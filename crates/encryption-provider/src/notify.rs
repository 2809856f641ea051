//! Change notification sink
//!
//! The resolver runs synchronously, while Kubernetes Events are published
//! asynchronously. [`ChannelNotifier`] bridges the two: it queues events on an
//! unbounded channel that [`forward_events`] drains into an
//! [`EventPublisher`].

use kube::runtime::events::EventType;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use encryption_common::events::EventPublisher;

/// Sink for change notifications
///
/// Delivery is fire-and-forget; implementations must not fail the caller.
pub trait ChangeNotifier: Send + Sync {
    /// Record a notification with a machine-readable reason and a message
    fn notify(&self, reason: &str, message: String);
}

/// A queued notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Event reason (e.g. "EncryptedGRsChanged")
    pub reason: String,
    /// Human-readable message
    pub message: String,
}

/// Notifier that queues events for asynchronous publishing
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end to hand to [`forward_events`]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ChangeNotifier for ChannelNotifier {
    fn notify(&self, reason: &str, message: String) {
        let event = ChangeEvent {
            reason: reason.to_string(),
            message,
        };
        if let Err(e) = self.tx.send(event) {
            warn!(reason = %e.0.reason, "Event forwarder is gone, dropping notification");
        }
    }
}

/// Publish queued notifications as Normal events
///
/// Returns when every [`ChannelNotifier`] clone has been dropped.
pub async fn forward_events(
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    publisher: &dyn EventPublisher,
) {
    while let Some(event) = rx.recv().await {
        debug!(reason = %event.reason, "Publishing change event");
        publisher
            .publish(EventType::Normal, &event.reason, event.message)
            .await;
    }
    debug!("Change event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, type_: EventType, reason: &str, note: String) {
            assert!(matches!(type_, EventType::Normal));
            self.published
                .lock()
                .unwrap()
                .push((reason.to_string(), note));
        }
    }

    #[tokio::test]
    async fn forwards_queued_events_in_order() {
        let (notifier, rx) = ChannelNotifier::new();
        notifier.notify("EncryptedGRsChanged", "first".to_string());
        notifier.notify("EncryptedGRsChanged", "second".to_string());
        drop(notifier);

        let publisher = RecordingPublisher::default();
        forward_events(rx, &publisher).await;

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "EncryptedGRsChanged");
        assert_eq!(published[0].1, "first");
        assert_eq!(published[1].1, "second");
    }

    #[test]
    fn notify_after_receiver_dropped_does_not_panic() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify("EncryptedGRsChanged", "lost".to_string());
    }
}
