use std::str::FromStr;

use bluer::rfcomm::{SocketAddr, Stream};
use bluer::Address;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, info};
use uuid::{uuid, Uuid};

use crate::config::LinkConfig;
use crate::models::link_event::LinkEvent;

/// Serial Port Profile service class. This is the service the HC-05 module
/// exposes its serial stream under.
pub const SPP_SERVICE_UUID: Uuid = uuid!("00001101-0000-1000-8000-00805f9b34fb");

/// The remote endpoint the link binds to.
#[derive(Debug, Clone, Copy)]
pub struct LinkTarget {
    pub address: Address,
    pub channel: u8,
}

/// Represents errors in opening the RFCOMM channel.
#[derive(Error, Debug)]
pub enum LinkServiceError {
    /// The configured device address does not parse as a Bluetooth address.
    #[error("Device address '{0}' is not a valid Bluetooth address.")]
    InvalidAddress(String),

    /// No usable adapter was found on the host.
    #[error("No Bluetooth adapter is available.")]
    AdapterUnavailable(#[source] bluer::Error),

    /// The adapter exists but is powered off.
    #[error("The Bluetooth adapter is powered off.")]
    AdapterDisabled,

    /// The stream to the remote device could not be opened.
    #[error("Failed to open an RFCOMM stream to the device: {0}")]
    ConnectFailed(String),
}

impl TryFrom<&LinkConfig> for LinkTarget {
    type Error = LinkServiceError;

    fn try_from(config: &LinkConfig) -> Result<Self, Self::Error> {
        let address = Address::from_str(&config.device_address)
            .map_err(|_| LinkServiceError::InvalidAddress(config.device_address.clone()))?;
        Ok(Self {
            address,
            channel: config.channel,
        })
    }
}

impl From<&LinkServiceError> for LinkEvent {
    fn from(error: &LinkServiceError) -> Self {
        match error {
            LinkServiceError::InvalidAddress(_) => LinkEvent::ConnectFailed(error.to_string()),
            LinkServiceError::AdapterUnavailable(_) => LinkEvent::AdapterUnavailable,
            LinkServiceError::AdapterDisabled => LinkEvent::AdapterDisabled,
            LinkServiceError::ConnectFailed(_) => LinkEvent::ConnectFailed(error.to_string()),
        }
    }
}

/// This service separates the external logic of opening the physical RFCOMM
/// channel from the controller logic, which makes the controller easier to
/// unit test.
#[allow(async_fn_in_trait)]
pub trait RfcommLinkService {
    type Stream: AsyncRead + Send + Unpin + 'static;

    /// Check adapter preconditions and open a stream to the target.
    /// Will return an appropriate error if the adapter is missing or
    /// powered off, or if the device is unreachable.
    async fn open(&self, target: LinkTarget) -> Result<Self::Stream, LinkServiceError>;
}

/// Opens RFCOMM streams through the host BlueZ stack.
pub struct BluerLinkService;

impl RfcommLinkService for BluerLinkService {
    type Stream = Stream;

    /// Use bluer to check that the default adapter is present and powered,
    /// then connect to the target address on the configured channel.
    async fn open(&self, target: LinkTarget) -> Result<Stream, LinkServiceError> {
        let session = bluer::Session::new()
            .await
            .map_err(LinkServiceError::AdapterUnavailable)?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(LinkServiceError::AdapterUnavailable)?;
        if !adapter
            .is_powered()
            .await
            .map_err(LinkServiceError::AdapterUnavailable)?
        {
            return Err(LinkServiceError::AdapterDisabled);
        }

        debug!(
            "Adapter '{}' is powered. Connecting to {} (SPP service {}) on channel {}.",
            adapter.name(),
            target.address,
            SPP_SERVICE_UUID,
            target.channel
        );
        let stream = Stream::connect(SocketAddr::new(target.address, target.channel))
            .await
            .map_err(|e| LinkServiceError::ConnectFailed(e.to_string()))?;
        info!("Opened RFCOMM stream to {}.", target.address);
        Ok(stream)
    }
}
