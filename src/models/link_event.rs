use std::fmt::Display;

/// User-facing notifications emitted as the sensor link changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The RFCOMM channel was opened and the read loop started.
    Connected,
    /// The channel was closed on request.
    Disconnected,
    /// No Bluetooth adapter is present on the host.
    AdapterUnavailable,
    /// The adapter exists but is powered off.
    AdapterDisabled,
    /// Opening the channel failed.
    ConnectFailed(String),
    /// The read loop hit a stream error and stopped.
    ReadFailed(String),
    /// The remote device closed the stream.
    RemoteClosed,
}

impl Display for LinkEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkEvent::Connected => write!(f, "Connection to the humidity sensor established."),
            LinkEvent::Disconnected => write!(f, "Connection to the humidity sensor closed."),
            LinkEvent::AdapterUnavailable => write!(f, "No Bluetooth adapter is available."),
            LinkEvent::AdapterDisabled => write!(f, "Please turn Bluetooth on."),
            LinkEvent::ConnectFailed(reason) => {
                write!(f, "Could not connect to the humidity sensor: {}", reason)
            }
            LinkEvent::ReadFailed(reason) => {
                write!(f, "Lost contact with the humidity sensor: {}", reason)
            }
            LinkEvent::RemoteClosed => write!(f, "The humidity sensor closed the connection."),
        }
    }
}
