use tracing::info;

use crate::models::link_event::LinkEvent;

/// This sink separates how a notification is surfaced from the notification
/// task, which makes the task easier to unit test.
pub trait NotificationSink {
    /// Surface one link event to the user.
    fn notify(&mut self, event: &LinkEvent);
}

/// Surfaces notifications as log lines, the toast equivalent on a headless
/// host.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&mut self, event: &LinkEvent) {
        info!("{}", event);
    }
}
