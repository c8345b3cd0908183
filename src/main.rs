pub mod config;
pub mod externals;
pub mod models;

use anyhow::Result;
use tokio::{signal, sync::broadcast};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::level_filters::LevelFilter;

use crate::config::LinkConfig;
use crate::externals::display::{services::TerminalDisplay, task::task_drive_display};
use crate::externals::notifications::{services::LogNotifier, task::task_user_notifications};
use crate::externals::sensor_link::{controller::SensorLinkController, services::BluerLinkService};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_max_level(LevelFilter::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = LinkConfig::load()?;

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let (tx_reading, rx_reading) = broadcast::channel(32);
    let (tx_link_event, rx_link_event) = broadcast::channel(32);

    let token_clone = token.clone();
    tracker.spawn(async { task_drive_display(token_clone, TerminalDisplay, rx_reading).await });

    let token_clone = token.clone();
    tracker.spawn(async { task_user_notifications(token_clone, LogNotifier, rx_link_event).await });

    let mut controller = SensorLinkController::new(
        BluerLinkService,
        &config,
        token.clone(),
        tracker.clone(),
        tx_reading,
        tx_link_event,
    )?;

    if let Err(e) = controller.connect().await {
        tracing::error!("Failed to connect to the sensor module. Error: {}", e);
    }

    tokio::select! {
        _ = token.cancelled() => {}
        res = signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!("Failed to listen for ctrl_c. Error: {}", e);
            }
        },
    }

    // Disconnect before cancelling the tasks so the closing notice is
    // still surfaced.
    controller.disconnect();
    token.cancel();
    tracker.close();
    tracker.wait().await;

    Ok(())
}
