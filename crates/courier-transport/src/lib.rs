//! Transport abstraction layer for Courier.
//!
//! Provides the [`DatagramTransport`] trait that abstracts over an
//! unreliable, connectionless datagram socket, plus [`UdpTransport`], the
//! implementation used by both the relay and its clients.
//!
//! Nothing in this layer retries, acknowledges, or orders datagrams. A
//! datagram that is lost on the wire is simply gone; higher layers decide
//! how long to wait for an answer.

#![allow(async_fn_in_trait)]

mod error;
mod udp;

pub use error::TransportError;
pub use udp::UdpTransport;

use std::net::SocketAddr;

/// The largest payload a single IPv4 UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// A single datagram together with the address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// The remote peer that sent this datagram.
    pub peer: SocketAddr,
    /// The datagram bytes, exactly as received.
    pub data: Vec<u8>,
}

/// Sends and receives whole datagrams.
///
/// There is no connection state: every `send_to` names its destination and
/// every `recv` reports its origin.
pub trait DatagramTransport: Send + Sync + 'static {
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one datagram to `peer`.
    async fn send_to(
        &self,
        data: &[u8],
        peer: SocketAddr,
    ) -> Result<(), Self::Error>;

    /// Waits for the next datagram from any peer.
    async fn recv(&self) -> Result<Datagram, Self::Error>;

    /// Returns the local address this transport is bound to.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datagram_equality_compares_peer_and_bytes() {
        let peer: SocketAddr = "127.0.0.1:5001".parse().unwrap();
        let a = Datagram { peer, data: vec![1, 2, 3] };
        let b = Datagram { peer, data: vec![1, 2, 3] };
        let c = Datagram { peer, data: vec![1, 2] };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_max_datagram_size_matches_ipv4_udp_limit() {
        // 65_535 minus the 8-byte UDP header and 20-byte IPv4 header.
        assert_eq!(MAX_DATAGRAM_SIZE, 65_535 - 8 - 20);
    }
}
