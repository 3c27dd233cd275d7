//! The relay dispatcher: turns one inbound datagram into at most one reply.
//!
//! Each datagram goes through the same steps:
//!   1. Decode as a request → drop on format or unknown-command errors
//!   2. Register the sender in the client registry
//!   3. Dispatch on the command
//!   4. Encode a reply (only for `GetClients` and `GetMessages`)
//!
//! A reply too large for one datagram is logged and not sent. For
//! `GetMessages` the mailbox is already drained at that point, and the log
//! records how many entries went with it.
//!
//! The dispatcher owns the registry and the mailbox store outright. It is
//! driven from a single task, so it needs no locks.

use courier_admission::AdmissionGate;
use courier_mailbox::{ClientRegistry, MailboxConfig, MailboxStore};
use courier_protocol::{
    BinaryCodec, Codec, Command, Envelope, Identity, Interaction,
};
use courier_transport::MAX_DATAGRAM_SIZE;

use crate::CourierError;

/// Relay state plus the logic that acts on it.
#[derive(Debug)]
pub struct Relay<C: Codec = BinaryCodec> {
    codec: C,
    gate: AdmissionGate,
    clients: ClientRegistry,
    mailboxes: MailboxStore,
}

impl Relay<BinaryCodec> {
    /// Creates a relay using the standard binary codec.
    pub fn new(gate: AdmissionGate, mailbox_config: MailboxConfig) -> Self {
        Self::with_codec(BinaryCodec::default(), gate, mailbox_config)
    }
}

impl<C: Codec> Relay<C> {
    /// Creates a relay with a custom codec.
    pub fn with_codec(
        codec: C,
        gate: AdmissionGate,
        mailbox_config: MailboxConfig,
    ) -> Self {
        Self {
            codec,
            gate,
            clients: ClientRegistry::new(),
            mailboxes: MailboxStore::new(mailbox_config),
        }
    }

    /// Handles one inbound datagram.
    ///
    /// Returns `Ok(Some(bytes))` when the request calls for a reply to the
    /// datagram's origin, and `Ok(None)` when it does not or when the reply
    /// would not fit in a datagram.
    ///
    /// # Errors
    /// Every error means "nothing to send back". Malformed frames, failed
    /// admission and full mailboxes all surface here so the caller can log
    /// them; none of them touch the mailboxes.
    pub fn handle(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, CourierError> {
        let envelope = self.codec.decode(data, Interaction::Request)?;
        let Envelope {
            sender,
            token,
            command,
        } = envelope;

        self.clients.register(&sender);

        let reply = match command {
            Command::GetClients => Command::ClientList {
                clients: self.clients.snapshot(),
            },
            Command::GetMessages => {
                let entries = self.mailboxes.drain(&sender);
                tracing::debug!(client = %sender, count = entries.len(), "mailbox drained");
                Command::MessageList { entries }
            }
            Command::SendMessage {
                recipient,
                ciphertext,
            } => {
                self.deliver(sender, token, recipient, ciphertext)?;
                return Ok(None);
            }
            other @ (Command::ClientList { .. } | Command::MessageList { .. }) => {
                tracing::debug!(
                    client = %sender,
                    command = other.name(),
                    "ignoring response-shaped command"
                );
                return Ok(None);
            }
        };

        let entries = match &reply {
            Command::ClientList { clients } => clients.len(),
            Command::MessageList { entries } => entries.len(),
            _ => 0,
        };
        let response = Envelope::new(sender, token, reply);
        let bytes = self.codec.encode(&response)?;

        if bytes.len() > MAX_DATAGRAM_SIZE {
            tracing::warn!(
                client = %response.sender,
                command = response.command.name(),
                len = bytes.len(),
                max = MAX_DATAGRAM_SIZE,
                lost_entries = entries,
                "response exceeds datagram limit, not sent"
            );
            return Ok(None);
        }
        Ok(Some(bytes))
    }

    /// Verifies the admission token, then files the message.
    fn deliver(
        &mut self,
        sender: Identity,
        token: u32,
        recipient: Identity,
        ciphertext: Vec<u8>,
    ) -> Result<(), CourierError> {
        self.gate.verify(&ciphertext, token)?;

        let len = ciphertext.len();
        let (from, to) = (sender.clone(), recipient.clone());
        self.mailboxes.append(recipient, ciphertext, sender)?;
        tracing::debug!(%from, %to, len, "message accepted");
        Ok(())
    }

    /// The set of identities seen so far.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// The undelivered messages.
    pub fn mailboxes(&self) -> &MailboxStore {
        &self.mailboxes
    }

    /// The admission gate applied to sends.
    pub fn gate(&self) -> AdmissionGate {
        self.gate
    }
}

// =========================================================================
// Tests
// =========================================================================
