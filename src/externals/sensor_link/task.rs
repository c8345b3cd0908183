use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{broadcast::Sender, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::models::{humidity::Humidity, link_event::LinkEvent};

use super::{controller::LinkState, parse::ParsePolicy};

/// Task: Read loop for an open RFCOMM stream. Reads chunks into a fixed-size
/// buffer, extracts humidity values with the selected policy, and broadcasts
/// them as readings. Exits on cancellation, remote close, or read error; the
/// link state transitions to closed whenever the stream stops being usable.
/// A cancelled loop never touches the link state, so a stale reader cannot
/// interfere with a connection opened after it.
/// Can be cancelled.
#[tracing::instrument(skip_all)]
pub async fn task_pump_readings<R>(
    token: CancellationToken,
    mut stream: R,
    policy: ParsePolicy,
    read_buffer_bytes: usize,
    tx_reading: Sender<Humidity>,
    tx_link_event: Sender<LinkEvent>,
    state: Arc<watch::Sender<LinkState>>,
) where
    R: AsyncRead + Unpin,
{
    info!("Started.");

    let mut buffer = vec![0u8; read_buffer_bytes];

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            read = stream.read(&mut buffer) => {
                // A disconnect can land while a read is in flight; once the
                // token is cancelled this reader no longer owns the state.
                if token.is_cancelled() {
                    warn!("Cancelled.");
                    break;
                }
                match read {
                    Ok(0) => {
                        info!("Remote closed the stream.");
                        state.send_replace(LinkState::Closed);
                        emit_link_event(&tx_link_event, LinkEvent::RemoteClosed);
                        break;
                    }
                    Ok(bytes_read) => {
                        trace!("Received {} bytes.", bytes_read);
                        process_chunk(&buffer[..bytes_read], policy, &tx_reading);
                    }
                    Err(e) => {
                        error!("Failed to read from stream. Error: {}", e);
                        state.send_replace(LinkState::Closed);
                        emit_link_event(&tx_link_event, LinkEvent::ReadFailed(e.to_string()));
                        break;
                    }
                }
            },
        };
    }
}

/// Decode one received chunk and broadcast the humidity reading it carries,
/// if any. Chunks that do not decode or parse are dropped.
fn process_chunk(chunk: &[u8], policy: ParsePolicy, tx_reading: &Sender<Humidity>) {
    let text = match std::str::from_utf8(chunk) {
        Ok(text) => text,
        Err(e) => {
            debug!("Dropping non-UTF-8 chunk. Error: {}", e);
            return;
        }
    };

    let Some(raw) = policy.extract(text) else {
        debug!("No humidity value in chunk '{}'.", text.trim());
        return;
    };
    let reading = match Humidity::try_from(raw) {
        Ok(reading) => reading,
        Err(e) => {
            debug!("Discarding unusable humidity value. Error: {}", e);
            return;
        }
    };

    match tx_reading.send(reading) {
        Err(e) => warn!("Failed to broadcast reading. Error: {}", e),
        Ok(_) => trace!("Broadcast reading {}.", reading),
    }
}

fn emit_link_event(tx_link_event: &Sender<LinkEvent>, event: LinkEvent) {
    if let Err(e) = tx_link_event.send(event) {
        warn!("Failed to broadcast link event. Error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::AsyncWriteExt;
    use tokio::sync::broadcast;

    use super::*;

    fn pump_fixture() -> (
        Arc<watch::Sender<LinkState>>,
        broadcast::Sender<Humidity>,
        broadcast::Sender<LinkEvent>,
    ) {
        let (state, _) = watch::channel(LinkState::Open);
        let (tx_reading, _) = broadcast::channel(32);
        let (tx_link_event, _) = broadcast::channel(32);
        (Arc::new(state), tx_reading, tx_link_event)
    }

    #[tokio::test]
    async fn test_chunks_become_readings() {
        let (state, tx_reading, tx_link_event) = pump_fixture();
        let (mut remote, local) = tokio::io::duplex(64);
        let mut rx_reading = tx_reading.subscribe();

        let pump = tokio::spawn(task_pump_readings(
            CancellationToken::new(),
            local,
            ParsePolicy::BareNumber,
            1024,
            tx_reading,
            tx_link_event,
            state,
        ));

        remote
            .write_all(b"45.2")
            .await
            .expect("Failed to write chunk.");
        let reading = rx_reading.recv().await.expect("Failed to receive reading.");
        assert_eq!(reading.value(), 45.2f32);

        drop(remote);
        pump.await.expect("Pump task panicked.");
    }

    #[tokio::test]
    async fn test_garbage_chunks_are_dropped() {
        let (state, tx_reading, tx_link_event) = pump_fixture();
        let (mut remote, local) = tokio::io::duplex(64);
        let mut rx_reading = tx_reading.subscribe();

        let pump = tokio::spawn(task_pump_readings(
            CancellationToken::new(),
            local,
            ParsePolicy::BareNumber,
            1024,
            tx_reading,
            tx_link_event,
            state,
        ));

        remote
            .write_all(b"garbage")
            .await
            .expect("Failed to write chunk.");
        drop(remote);
        pump.await.expect("Pump task panicked.");

        assert!(rx_reading.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remote_close_marks_link_closed() {
        let (state, tx_reading, tx_link_event) = pump_fixture();
        let (remote, local) = tokio::io::duplex(64);
        let mut rx_state = state.subscribe();
        let mut rx_link_event = tx_link_event.subscribe();

        let pump = tokio::spawn(task_pump_readings(
            CancellationToken::new(),
            local,
            ParsePolicy::BareNumber,
            1024,
            tx_reading,
            tx_link_event,
            state,
        ));

        drop(remote);
        pump.await.expect("Pump task panicked.");

        assert_eq!(*rx_state.borrow_and_update(), LinkState::Closed);
        assert_eq!(
            rx_link_event.recv().await.expect("Failed to receive event."),
            LinkEvent::RemoteClosed
        );
    }

    struct FailingStream;

    impl AsyncRead for FailingStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "radio fell over")))
        }
    }

    #[tokio::test]
    async fn test_read_failure_marks_link_closed() {
        let (state, tx_reading, tx_link_event) = pump_fixture();
        let mut rx_state = state.subscribe();
        let mut rx_link_event = tx_link_event.subscribe();

        task_pump_readings(
            CancellationToken::new(),
            FailingStream,
            ParsePolicy::BareNumber,
            1024,
            tx_reading,
            tx_link_event,
            state,
        )
        .await;

        assert_eq!(*rx_state.borrow_and_update(), LinkState::Closed);
        assert!(matches!(
            rx_link_event.recv().await.expect("Failed to receive event."),
            LinkEvent::ReadFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_reader_leaves_state_untouched() {
        let (state, tx_reading, tx_link_event) = pump_fixture();
        let mut rx_state = state.subscribe();
        let mut rx_link_event = tx_link_event.subscribe();
        let token = CancellationToken::new();
        token.cancel();

        // Even with a stream that fails instantly, a reader whose token is
        // already cancelled must exit without closing the link or emitting
        // events; the state now belongs to the next connection.
        task_pump_readings(
            token,
            FailingStream,
            ParsePolicy::BareNumber,
            1024,
            tx_reading,
            tx_link_event,
            state,
        )
        .await;

        assert_eq!(*rx_state.borrow_and_update(), LinkState::Open);
        assert!(rx_link_event.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_loop() {
        let (state, tx_reading, tx_link_event) = pump_fixture();
        let (_remote, local) = tokio::io::duplex(64);
        let token = CancellationToken::new();

        let pump = tokio::spawn(task_pump_readings(
            token.clone(),
            local,
            ParsePolicy::BareNumber,
            1024,
            tx_reading,
            tx_link_event,
            state.clone(),
        ));

        token.cancel();
        pump.await.expect("Pump task panicked.");
    }
}
