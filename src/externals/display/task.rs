use tokio::sync::broadcast::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::models::humidity::Humidity;

use super::services::DisplaySink;

/// Task: Drive the display sink with readings as they arrive.
/// Can be cancelled.
#[tracing::instrument(skip_all)]
pub async fn task_drive_display(
    token: CancellationToken,
    mut sink: impl DisplaySink,
    mut rx_reading: Receiver<Humidity>,
) {
    info!("Started.");
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            Ok(reading) = rx_reading.recv() => {
                trace!("Displaying reading {}.", reading);
                sink.show(reading);
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::broadcast;

    use super::*;

    /// Records everything shown, in place of a real widget.
    struct RecordingDisplay {
        shown: Arc<Mutex<Vec<(String, u8)>>>,
    }

    impl DisplaySink for RecordingDisplay {
        fn show(&mut self, reading: Humidity) {
            self.shown
                .lock()
                .expect("Display mutex poisoned.")
                .push((reading.to_string(), reading.progress()));
        }
    }

    #[tokio::test]
    async fn test_readings_reach_the_sink() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingDisplay {
            shown: shown.clone(),
        };
        let token = CancellationToken::new();
        let (tx_reading, rx_reading) = broadcast::channel(32);

        let display = tokio::spawn(task_drive_display(token.clone(), sink, rx_reading));

        tx_reading
            .send(Humidity::try_from(45.2f32).expect("Failed to create reading."))
            .expect("Failed to send reading.");
        tx_reading
            .send(Humidity::try_from(60.0f32).expect("Failed to create reading."))
            .expect("Failed to send reading.");

        // Give the task a chance to drain the channel before cancelling.
        tokio::task::yield_now().await;
        while shown.lock().expect("Display mutex poisoned.").len() < 2 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        token.cancel();
        display.await.expect("Display task panicked.");

        let shown = shown.lock().expect("Display mutex poisoned.");
        assert_eq!(shown[0], ("45.2%".to_string(), 45));
        assert_eq!(shown[1], ("60.0%".to_string(), 60));
    }
}
