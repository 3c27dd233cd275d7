//! Client side: assembling requests and talking to a relay.
//!
//! [`EnvelopeBuilder`] is pure. It frames requests and, for sends, searches
//! for the admission token. [`RelayClient`] puts a UDP socket, a deadline
//! and request correlation around it.
//!
//! ## Correlation
//!
//! The relay echoes the requester's identity and token in every response.
//! `GetClients` and `GetMessages` therefore carry a fresh random token, and
//! the client ignores any datagram that does not echo it back. A response
//! that arrives after its request timed out is discarded by the next
//! request instead of being mistaken for that request's answer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use courier_admission::AdmissionGate;
use courier_protocol::{
    BinaryCodec, Codec, Command, CommandTag, Envelope, Identity, Interaction,
    MailboxEntry,
};
use courier_transport::{DatagramTransport, UdpTransport};
use rand::Rng;
use tokio::time::Instant;

use crate::collaborators::{Cipher, CipherError};
use crate::config::ClientConfig;
use crate::CourierError;

// ---------------------------------------------------------------------------
// EnvelopeBuilder
// ---------------------------------------------------------------------------

/// Builds outgoing envelopes for one identity.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder<C: Codec = BinaryCodec> {
    identity: Identity,
    gate: AdmissionGate,
    codec: C,
}

impl EnvelopeBuilder<BinaryCodec> {
    /// Creates a builder using the standard binary codec.
    pub fn new(identity: Identity, gate: AdmissionGate) -> Self {
        Self::with_codec(identity, gate, BinaryCodec::default())
    }
}

impl<C: Codec> EnvelopeBuilder<C> {
    /// Creates a builder with a custom codec.
    pub fn with_codec(identity: Identity, gate: AdmissionGate, codec: C) -> Self {
        Self {
            identity,
            gate,
            codec,
        }
    }

    /// The identity stamped on every envelope.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The gate used to solve sends.
    pub fn gate(&self) -> AdmissionGate {
        self.gate
    }

    /// A `GetClients` request.
    pub fn get_clients(&self, token: u32) -> Envelope {
        Envelope::new(self.identity.clone(), token, Command::GetClients)
    }

    /// A `GetMessages` request.
    pub fn get_messages(&self, token: u32) -> Envelope {
        Envelope::new(self.identity.clone(), token, Command::GetMessages)
    }

    /// A `SendMessage` request carrying an admissible token.
    ///
    /// Blocks while searching for the token. At the default difficulty this
    /// takes around a million hashes; run it on a blocking worker.
    pub fn send_message(
        &self,
        recipient: Identity,
        ciphertext: Vec<u8>,
    ) -> Result<Envelope, CourierError> {
        let token = self.gate.solve(&ciphertext)?;
        Ok(self.send_message_with_token(recipient, ciphertext, token))
    }

    /// A `SendMessage` request with a caller-chosen token. No search, no check.
    pub fn send_message_with_token(
        &self,
        recipient: Identity,
        ciphertext: Vec<u8>,
        token: u32,
    ) -> Envelope {
        Envelope::new(
            self.identity.clone(),
            token,
            Command::SendMessage {
                recipient,
                ciphertext,
            },
        )
    }

    /// Frames an envelope.
    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, CourierError> {
        Ok(self.codec.encode(envelope)?)
    }

    /// Parses a datagram from the relay.
    pub fn decode_response(&self, data: &[u8]) -> Result<Envelope, CourierError> {
        Ok(self.codec.decode(data, Interaction::Response)?)
    }
}

// ---------------------------------------------------------------------------
// RelayClient
// ---------------------------------------------------------------------------

/// A message the client fetched and decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Who sent it.
    pub sender: Identity,
    /// The decrypted body.
    pub plaintext: Vec<u8>,
}

/// A fetched message the cipher could not open.
///
/// The relay no longer holds it, so the raw ciphertext is handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnopenedMessage {
    /// Who sent it.
    pub sender: Identity,
    /// The ciphertext exactly as the relay returned it.
    pub ciphertext: Vec<u8>,
    /// Why opening failed.
    pub error: CipherError,
}

/// Opens each entry on its own. A failure affects only its own slot.
pub(crate) fn open_entries(
    cipher: &impl Cipher,
    entries: Vec<MailboxEntry>,
) -> Vec<Result<ReceivedMessage, UnopenedMessage>> {
    entries
        .into_iter()
        .map(|entry| match cipher.open(&entry.ciphertext, &entry.sender) {
            Ok(plaintext) => Ok(ReceivedMessage {
                sender: entry.sender,
                plaintext,
            }),
            Err(error) => {
                tracing::warn!(from = %entry.sender, error = %error, "could not open message");
                Err(UnopenedMessage {
                    sender: entry.sender,
                    ciphertext: entry.ciphertext,
                    error,
                })
            }
        })
        .collect()
}

/// An async client bound to one relay.
///
/// Methods that wait for a response take `&mut self`, so at most one
/// request is outstanding per client.
pub struct RelayClient {
    transport: UdpTransport,
    relay: SocketAddr,
    builder: Arc<EnvelopeBuilder>,
    timeout: Duration,
    known_clients: Vec<Identity>,
}

impl RelayClient {
    /// Binds a local socket and prepares to talk to the configured relay.
    pub async fn connect(
        config: &ClientConfig,
        identity: Identity,
    ) -> Result<Self, CourierError> {
        let relay = config.relay_addr().await?;
        let gate = config.gate()?;
        let transport = UdpTransport::bind(&config.bind).await?;

        tracing::info!(%relay, identity = %identity, "client ready");
        Ok(Self {
            transport,
            relay,
            builder: Arc::new(EnvelopeBuilder::new(identity, gate)),
            timeout: config.response_timeout(),
            known_clients: Vec::new(),
        })
    }

    /// This client's identity.
    pub fn identity(&self) -> &Identity {
        self.builder.identity()
    }

    /// The relay this client talks to.
    pub fn relay_addr(&self) -> SocketAddr {
        self.relay
    }

    /// The local socket address.
    pub fn local_addr(&self) -> Result<SocketAddr, CourierError> {
        Ok(self.transport.local_addr()?)
    }

    /// The client list from the most recent successful `get_clients`.
    pub fn known_clients(&self) -> &[Identity] {
        &self.known_clients
    }

    /// Fetches the relay's client list and caches it for
    /// [`send_to_known`](Self::send_to_known).
    ///
    /// # Errors
    /// Returns [`CourierError::Timeout`] if no matching response arrives.
    pub async fn get_clients(&mut self) -> Result<Vec<Identity>, CourierError> {
        let token = rand::rng().random();
        let envelope = self.builder.get_clients(token);

        match self.request(envelope).await? {
            Command::ClientList { clients } => {
                tracing::debug!(count = clients.len(), "client list received");
                self.known_clients = clients.clone();
                Ok(clients)
            }
            other => Err(CourierError::UnexpectedResponse(other.name().to_string())),
        }
    }

    /// Drains this client's mailbox on the relay.
    ///
    /// The relay empties the mailbox before replying. If the reply is lost,
    /// so are the messages.
    pub async fn get_messages(&mut self) -> Result<Vec<MailboxEntry>, CourierError> {
        let token = rand::rng().random();
        let envelope = self.builder.get_messages(token);

        match self.request(envelope).await? {
            Command::MessageList { entries } => {
                tracing::debug!(count = entries.len(), "messages received");
                Ok(entries)
            }
            other => Err(CourierError::UnexpectedResponse(other.name().to_string())),
        }
    }

    /// Solves the admission puzzle and sends `ciphertext` to `recipient`.
    ///
    /// The relay never acknowledges a send. Returns the token used.
    pub async fn send_message(
        &self,
        recipient: &Identity,
        ciphertext: Vec<u8>,
    ) -> Result<u32, CourierError> {
        let builder = Arc::clone(&self.builder);
        let recipient = recipient.clone();
        let envelope = tokio::task::spawn_blocking(move || {
            builder.send_message(recipient, ciphertext)
        })
        .await
        .map_err(|e| CourierError::Worker(e.to_string()))??;

        let data = self.builder.encode(&envelope)?;
        self.transport.send_to(&data, self.relay).await?;
        tracing::debug!(token = envelope.token, len = data.len(), "message sent");
        Ok(envelope.token)
    }

    /// Sends to the `index`-th entry of the cached client list.
    ///
    /// # Errors
    /// Returns [`CourierError::UnknownClient`] if the index is out of range,
    /// including when `get_clients` has never been called.
    pub async fn send_to_known(
        &self,
        index: usize,
        ciphertext: Vec<u8>,
    ) -> Result<u32, CourierError> {
        let recipient = self.known_clients.get(index).ok_or(
            CourierError::UnknownClient {
                index,
                known: self.known_clients.len(),
            },
        )?;
        self.send_message(recipient, ciphertext).await
    }

    /// Seals `plaintext` for `recipient` and sends it.
    pub async fn send_text(
        &self,
        cipher: &impl Cipher,
        recipient: &Identity,
        plaintext: &[u8],
    ) -> Result<u32, CourierError> {
        let ciphertext = cipher.seal(plaintext, recipient)?;
        self.send_message(recipient, ciphertext).await
    }

    /// Drains the mailbox and opens every message.
    ///
    /// Each entry gets its own result, in mailbox order. One message that
    /// fails to open does not cost the caller the others.
    pub async fn read_messages(
        &mut self,
        cipher: &impl Cipher,
    ) -> Result<Vec<Result<ReceivedMessage, UnopenedMessage>>, CourierError> {
        let entries = self.get_messages().await?;
        Ok(open_entries(cipher, entries))
    }

    /// Sends `envelope` and waits for the matching response.
    async fn request(&mut self, envelope: Envelope) -> Result<Command, CourierError> {
        let data = self.builder.encode(&envelope)?;
        self.transport.send_to(&data, self.relay).await?;
        self.await_response(envelope.token, envelope.tag()).await
    }

    async fn await_response(
        &self,
        token: u32,
        tag: CommandTag,
    ) -> Result<Command, CourierError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let datagram =
                match tokio::time::timeout_at(deadline, self.transport.recv()).await {
                    Ok(result) => result?,
                    Err(_) => return Err(CourierError::Timeout(self.timeout)),
                };

            if datagram.peer != self.relay {
                tracing::debug!(peer = %datagram.peer, "ignoring datagram from non-relay peer");
                continue;
            }

            let envelope = match self.builder.decode_response(&datagram.data) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring malformed response");
                    continue;
                }
            };

            if envelope.token != token
                || envelope.tag() != tag
                || &envelope.sender != self.identity()
            {
                tracing::debug!(
                    expected = token,
                    got = envelope.token,
                    tag = %envelope.tag(),
                    "ignoring stale response"
                );
                continue;
            }

            return Ok(envelope.command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_admission::Difficulty;

    fn builder(zeros: u8) -> EnvelopeBuilder {
        EnvelopeBuilder::new(
            Identity::new("alice"),
            AdmissionGate::new(Difficulty::new(zeros).unwrap()),
        )
    }

    #[test]
    fn test_get_clients_envelope_carries_identity_and_token() {
        let env = builder(1).get_clients(42);
        assert_eq!(env.sender, Identity::new("alice"));
        assert_eq!(env.token, 42);
        assert_eq!(env.command, Command::GetClients);
    }

    #[test]
    fn test_get_messages_envelope() {
        let env = builder(1).get_messages(7);
        assert_eq!(env.tag(), CommandTag::GET_MESSAGES);
        assert_eq!(env.token, 7);
    }

    #[test]
    fn test_send_message_token_is_admissible() {
        let b = builder(2);
        let env = b.send_message(Identity::new("bob"), b"AB".to_vec()).unwrap();
        assert_eq!(env.token, 1214);
        assert!(b.gate().is_admissible(b"AB", env.token));
        assert_eq!(
            env.command,
            Command::SendMessage {
                recipient: Identity::new("bob"),
                ciphertext: b"AB".to_vec(),
            }
        );
    }

    #[test]
    fn test_send_message_with_token_skips_search() {
        let env = builder(7).send_message_with_token(Identity::new("bob"), b"x".to_vec(), 0);
        assert_eq!(env.token, 0);
    }

    #[test]
    fn test_encode_then_decode_response_rejects_request_shape() {
        let b = builder(1);
        let bytes = b.encode(&b.get_clients(1)).unwrap();
        // A bare GetClients request has no client-count field, so it is
        // not a valid response.
        assert!(matches!(
            b.decode_response(&bytes),
            Err(CourierError::Protocol(_))
        ));
    }

    struct RejectGarbage;

    impl Cipher for RejectGarbage {
        fn seal(&self, plaintext: &[u8], _: &Identity) -> Result<Vec<u8>, CipherError> {
            Ok(plaintext.to_vec())
        }

        fn open(&self, ciphertext: &[u8], _: &Identity) -> Result<Vec<u8>, CipherError> {
            if ciphertext == b"garbage" {
                Err(CipherError("bad".into()))
            } else {
                Ok(ciphertext.to_vec())
            }
        }
    }

    fn entry(from: &str, body: &[u8]) -> MailboxEntry {
        MailboxEntry {
            ciphertext: body.to_vec(),
            sender: Identity::new(from),
        }
    }

    #[test]
    fn test_open_entries_keeps_good_messages_around_a_bad_one() {
        let opened = open_entries(
            &RejectGarbage,
            vec![
                entry("alice", b"one"),
                entry("mallory", b"garbage"),
                entry("alice", b"two"),
            ],
        );

        assert_eq!(opened.len(), 3);
        assert_eq!(
            opened[0],
            Ok(ReceivedMessage {
                sender: Identity::new("alice"),
                plaintext: b"one".to_vec(),
            })
        );
        assert_eq!(
            opened[1],
            Err(UnopenedMessage {
                sender: Identity::new("mallory"),
                ciphertext: b"garbage".to_vec(),
                error: CipherError("bad".into()),
            })
        );
        assert_eq!(opened[2].as_ref().unwrap().plaintext, b"two");
    }
}
