/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,

    /// The length prefix of a frame could not be read.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame exceeded the configured maximum length.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

impl TransportError {
    /// Whether the byte stream can no longer be trusted to be aligned on
    /// frame boundaries.
    pub fn is_framing_corruption(&self) -> bool {
        matches!(self, Self::MalformedFrame(_) | Self::FrameTooLarge { .. })
    }
}
