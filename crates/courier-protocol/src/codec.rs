//! Codec trait and the binary frame codec.
//!
//! A "codec" (coder/decoder) converts between [`Envelope`]s and raw
//! datagram bytes. The relay and client only depend on the [`Codec`]
//! trait; [`BinaryCodec`] is the implementation that speaks the wire
//! format:
//!
//! ```text
//! offset  size  field
//! 0       2     command_tag       (u16, big-endian)
//! 2       4     identity_len      (u32, big-endian)
//! 6       4     admission_token   (u32, big-endian)
//! 10      n     identity_bytes    (UTF-8 PEM text)
//! 10+n    ..    payload_bytes     (rest of the datagram)
//! ```
//!
//! The header carries no payload length: the payload is whatever follows
//! the identity. Payload parsing is delegated to the [`CommandRegistry`].

use std::sync::Arc;

use bytes::BufMut;

use crate::wire::{wire_len, Reader};
use crate::{CommandRegistry, CommandTag, Envelope, Interaction, ProtocolError};

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 2 + 4 + 4;

/// Converts envelopes to bytes and back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec can be shared with blocking worker threads
///   (the client builds envelopes off the async runtime).
/// - `'static` → the codec owns everything it needs.
pub trait Codec: Send + Sync + 'static {
    /// Frames an envelope into datagram bytes.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the command has no registered codec
    /// or a field is too long for its length prefix.
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError>;

    /// Parses datagram bytes into an envelope.
    ///
    /// `interaction` selects between request and response payload shapes
    /// for tags that have both.
    ///
    /// # Errors
    /// Returns a format error for structurally broken frames and
    /// [`ProtocolError::UnknownCommand`] for unregistered tags.
    fn decode(
        &self,
        data: &[u8],
        interaction: Interaction,
    ) -> Result<Envelope, ProtocolError>;
}

// ---------------------------------------------------------------------------
// BinaryCodec
// ---------------------------------------------------------------------------

/// The big-endian, length-prefixed frame codec.
///
/// Cloning is cheap: the registry is shared behind an `Arc`.
///
/// ## Example
///
/// ```rust
/// use courier_protocol::{BinaryCodec, Codec, Command, Envelope, Identity, Interaction};
///
/// let codec = BinaryCodec::default();
/// let envelope = Envelope::new(Identity::new("alice"), 42, Command::GetClients);
///
/// let bytes = codec.encode(&envelope).unwrap();
/// assert_eq!(bytes.len(), 10 + "alice".len());
///
/// let decoded = codec.decode(&bytes, Interaction::Request).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[derive(Debug, Clone)]
pub struct BinaryCodec {
    registry: Arc<CommandRegistry>,
}

impl BinaryCodec {
    /// Creates a codec backed by the given registry.
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The registry this codec dispatches payloads through.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self::new(CommandRegistry::standard())
    }
}

impl Codec for BinaryCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
        let identity = envelope.sender.as_bytes();
        let identity_len = wire_len(identity.len(), "identity")?;

        let mut buf = Vec::with_capacity(HEADER_LEN + identity.len());
        buf.put_u16(envelope.tag().0);
        buf.put_u32(identity_len);
        buf.put_u32(envelope.token);
        buf.put_slice(identity);
        self.registry.encode_payload(&envelope.command, &mut buf)?;
        Ok(buf)
    }

    fn decode(
        &self,
        data: &[u8],
        interaction: Interaction,
    ) -> Result<Envelope, ProtocolError> {
        if data.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                field: "header",
                needed: HEADER_LEN,
                available: data.len(),
            });
        }

        let mut r = Reader::new(data);
        let tag = CommandTag(r.read_u16("command_tag")?);
        let identity_len = r.read_len("identity_len")?;
        let token = r.read_u32("admission_token")?;
        let sender = r.take_identity(identity_len, "identity")?;

        let command =
            self.registry
                .decode_payload(tag, interaction, r.rest())?;

        Ok(Envelope {
            sender,
            token,
            command,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
