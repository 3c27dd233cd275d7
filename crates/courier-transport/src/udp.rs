//! UDP transport implementation using `tokio::net::UdpSocket`.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::{Datagram, DatagramTransport, TransportError, MAX_DATAGRAM_SIZE};

/// Default receive buffer: large enough for any UDP payload.
const DEFAULT_RECV_BUFFER: usize = 65_535;

/// A UDP-based [`DatagramTransport`].
///
/// Datagrams larger than the receive buffer are truncated by the OS; the
/// protocol layer then rejects them as malformed.
pub struct UdpTransport {
    socket: UdpSocket,
    recv_buffer_size: usize,
}

impl UdpTransport {
    /// Binds a new UDP socket to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        let local = socket.local_addr().map_err(TransportError::BindFailed)?;
        tracing::info!(%local, "UDP transport bound");
        Ok(Self {
            socket,
            recv_buffer_size: DEFAULT_RECV_BUFFER,
        })
    }

    /// Sets the size of the buffer each `recv` reads into.
    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.max(1);
        self
    }

    /// Returns the configured receive buffer size.
    pub fn recv_buffer_size(&self) -> usize {
        self.recv_buffer_size
    }
}

impl DatagramTransport for UdpTransport {
    type Error = TransportError;

    async fn send_to(
        &self,
        data: &[u8],
        peer: SocketAddr,
    ) -> Result<(), Self::Error> {
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::DatagramTooLarge {
                size: data.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }

        let sent = self
            .socket
            .send_to(data, peer)
            .await
            .map_err(TransportError::SendFailed)?;
        if sent != data.len() {
            return Err(TransportError::ShortSend {
                sent,
                expected: data.len(),
            });
        }

        tracing::trace!(%peer, len = sent, "datagram sent");
        Ok(())
    }

    async fn recv(&self) -> Result<Datagram, Self::Error> {
        let mut buf = vec![0u8; self.recv_buffer_size];
        let (len, peer) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        buf.truncate(len);

        tracing::trace!(%peer, len, "datagram received");
        Ok(Datagram { peer, data: buf })
    }

    fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
        self.socket.local_addr().map_err(TransportError::BindFailed)
    }
}
