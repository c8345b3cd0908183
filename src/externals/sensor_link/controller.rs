use std::sync::Arc;

use tokio::sync::{broadcast::Sender, watch};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::{
    config::LinkConfig,
    models::{humidity::Humidity, link_event::LinkEvent},
};

use super::{
    parse::ParsePolicy,
    services::{LinkServiceError, LinkTarget, RfcommLinkService},
    task::task_pump_readings,
};

/// Whether the RFCOMM channel is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Closed,
    Open,
}

/// Owns the sensor connection: its preconditions, its state, and the
/// lifetime of the read loop pumping readings out of it.
///
/// State lives in a watch channel written only by this controller and its
/// read loop, and each connection gets its own child cancellation token, so
/// a disconnect reliably terminates the reader and a reconnect can never
/// race a stale one.
pub struct SensorLinkController<S: RfcommLinkService> {
    service: S,
    target: LinkTarget,
    policy: ParsePolicy,
    read_buffer_bytes: usize,
    token: CancellationToken,
    tracker: TaskTracker,
    tx_reading: Sender<Humidity>,
    tx_link_event: Sender<LinkEvent>,
    state: Arc<watch::Sender<LinkState>>,
    link_token: Option<CancellationToken>,
}

impl<S: RfcommLinkService> SensorLinkController<S> {
    /// Build a controller for the device named in the config.
    /// Will return an error if the configured address is malformed.
    pub fn new(
        service: S,
        config: &LinkConfig,
        token: CancellationToken,
        tracker: TaskTracker,
        tx_reading: Sender<Humidity>,
        tx_link_event: Sender<LinkEvent>,
    ) -> Result<Self, LinkServiceError> {
        let target = LinkTarget::try_from(config)?;
        let (state, _) = watch::channel(LinkState::Closed);
        Ok(Self {
            service,
            target,
            policy: config.parse_policy,
            read_buffer_bytes: config.read_buffer_bytes,
            token,
            tracker,
            tx_reading,
            tx_link_event,
            state: Arc::new(state),
            link_token: None,
        })
    }

    /// Open the RFCOMM channel and start the read loop.
    /// Emits a user notification on success and on every failure; on failure
    /// the link stays closed. A connect while already open is a no-op.
    pub async fn connect(&mut self) -> Result<(), LinkServiceError> {
        if self.is_connected() {
            debug!("Already connected. Ignoring connect request.");
            return Ok(());
        }

        let stream = match self.service.open(self.target).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open the sensor link. Error: {}", e);
                self.notify(LinkEvent::from(&e));
                return Err(e);
            }
        };

        let link_token = self.token.child_token();
        self.link_token = Some(link_token.clone());
        self.state.send_replace(LinkState::Open);
        info!("Sensor link is open.");
        self.notify(LinkEvent::Connected);

        let policy = self.policy;
        let read_buffer_bytes = self.read_buffer_bytes;
        let tx_reading = self.tx_reading.clone();
        let tx_link_event = self.tx_link_event.clone();
        let state = self.state.clone();
        self.tracker.spawn(async move {
            task_pump_readings(
                link_token,
                stream,
                policy,
                read_buffer_bytes,
                tx_reading,
                tx_link_event,
                state,
            )
            .await
        });

        Ok(())
    }

    /// Close the channel if open and stop the read loop. Idempotent.
    pub fn disconnect(&mut self) {
        let Some(link_token) = self.link_token.take() else {
            debug!("Already disconnected. Nothing to do.");
            return;
        };

        let was_open = self.is_connected();
        link_token.cancel();
        self.state.send_replace(LinkState::Closed);
        if was_open {
            info!("Sensor link closed.");
            self.notify(LinkEvent::Disconnected);
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == LinkState::Open
    }

    /// Observe link state transitions, including those made by the read
    /// loop when the stream dies underneath it.
    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    fn notify(&self, event: LinkEvent) {
        if let Err(e) = self.tx_link_event.send(event) {
            warn!("Failed to broadcast link event. Error: {}", e);
        }
    }
}
