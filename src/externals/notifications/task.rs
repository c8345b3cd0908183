use tokio::sync::broadcast::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::link_event::LinkEvent;

use super::services::NotificationSink;

/// Task: Surface link events to the user. On cancellation, events still
/// queued are delivered before exiting so a final disconnect notice is not
/// lost during shutdown.
/// Can be cancelled.
#[tracing::instrument(skip_all)]
pub async fn task_user_notifications(
    token: CancellationToken,
    mut sink: impl NotificationSink,
    mut rx_link_event: Receiver<LinkEvent>,
) {
    info!("Started.");
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                while let Ok(event) = rx_link_event.try_recv() {
                    sink.notify(&event);
                }
                break;
            },
            Ok(event) = rx_link_event.recv() => {
                sink.notify(&event);
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::broadcast;

    use super::*;

    /// Records everything notified, in place of the log surface.
    struct RecordingNotifier {
        notified: Arc<Mutex<Vec<LinkEvent>>>,
    }

    impl NotificationSink for RecordingNotifier {
        fn notify(&mut self, event: &LinkEvent) {
            self.notified
                .lock()
                .expect("Notifier mutex poisoned.")
                .push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_events_queued_at_shutdown_are_still_delivered() {
        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingNotifier {
            notified: notified.clone(),
        };
        let token = CancellationToken::new();
        let (tx_link_event, rx_link_event) = broadcast::channel(32);

        let notifications =
            tokio::spawn(task_user_notifications(token.clone(), sink, rx_link_event));

        tx_link_event
            .send(LinkEvent::Connected)
            .expect("Failed to send event.");

        // The closing notice races the cancellation; it must be delivered
        // either way.
        tx_link_event
            .send(LinkEvent::Disconnected)
            .expect("Failed to send event.");
        token.cancel();
        notifications.await.expect("Notification task panicked.");

        let notified = notified.lock().expect("Notifier mutex poisoned.");
        assert_eq!(
            *notified,
            vec![LinkEvent::Connected, LinkEvent::Disconnected]
        );
    }
}
