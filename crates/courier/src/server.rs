//! `RelayServer` builder and receive loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → protocol → admission → mailbox.

use std::net::SocketAddr;

use courier_protocol::{BinaryCodec, Codec};
use courier_transport::{DatagramTransport, TransportError, UdpTransport};

use crate::config::RelayConfig;
use crate::relay::Relay;
use crate::CourierError;

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// use courier::prelude::*;
///
/// # async fn start() -> Result<(), CourierError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:5001")
///     .difficulty(5)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Replaces every setting with those in `config`.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the relay to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the proof-of-work difficulty for sends.
    pub fn difficulty(mut self, zeros: u8) -> Self {
        self.config.difficulty = zeros;
        self
    }

    /// Caps each recipient's mailbox at `limit` messages.
    pub fn max_messages_per_mailbox(mut self, limit: usize) -> Self {
        self.config.max_messages_per_mailbox = Some(limit);
        self
    }

    /// Binds the socket and builds the relay.
    ///
    /// # Errors
    /// Fails if the difficulty is out of range or the address cannot be
    /// bound.
    pub async fn build(self) -> Result<RelayServer, CourierError> {
        let gate = self.config.gate()?;
        let transport = UdpTransport::bind(&self.config.bind)
            .await?
            .with_recv_buffer_size(self.config.recv_buffer_size);
        let relay = Relay::new(gate, self.config.mailbox_config());

        tracing::info!(
            difficulty = %gate.difficulty(),
            mailbox_cap = ?self.config.max_messages_per_mailbox,
            "relay configured"
        );
        Ok(RelayServer::new(transport, relay))
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A relay bound to a transport.
///
/// Call [`run()`](Self::run) to start serving.
pub struct RelayServer<T = UdpTransport, C = BinaryCodec>
where
    T: DatagramTransport<Error = TransportError>,
    C: Codec,
{
    transport: T,
    relay: Relay<C>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<T, C> RelayServer<T, C>
where
    T: DatagramTransport<Error = TransportError>,
    C: Codec,
{
    /// Wraps an already-bound transport.
    pub fn new(transport: T, relay: Relay<C>) -> Self {
        Self { transport, relay }
    }

    /// Returns the local address the relay is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, CourierError> {
        Ok(self.transport.local_addr()?)
    }

    /// The dispatcher and its state.
    pub fn relay(&self) -> &Relay<C> {
        &self.relay
    }

    /// Receives one datagram and acts on it.
    ///
    /// Decode, admission and mailbox failures are logged and swallowed;
    /// only a failed `recv` is returned.
    pub async fn serve_one(&mut self) -> Result<(), CourierError> {
        let datagram = self.transport.recv().await?;
        let peer = datagram.peer;

        let reply = match self.relay.handle(&datagram.data) {
            Ok(Some(reply)) => reply,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!(%peer, error = %e, "datagram dropped");
                return Ok(());
            }
        };

        if let Err(e) = self.transport.send_to(&reply, peer).await {
            tracing::warn!(%peer, error = %e, "failed to send response");
        }
        Ok(())
    }

    /// Runs the receive loop.
    ///
    /// Handles datagrams one at a time, to completion, until the process is
    /// terminated. Transport errors are logged and the loop carries on.
    pub async fn run(mut self) -> Result<(), CourierError> {
        let local = self.local_addr()?;
        tracing::info!(%local, "Courier relay running");

        loop {
            if let Err(e) = self.serve_one().await {
                tracing::warn!(error = %e, "receive failed");
            }
        }
    }
}
