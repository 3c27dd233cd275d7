/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the local socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Sending a datagram failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a datagram failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The datagram does not fit in a single UDP payload.
    #[error("datagram of {size} bytes exceeds the {max}-byte limit")]
    DatagramTooLarge { size: usize, max: usize },

    /// The OS accepted fewer bytes than the datagram holds.
    #[error("short send: {sent} of {expected} bytes")]
    ShortSend { sent: usize, expected: usize },
}
