//! Core protocol types for Courier's wire format.
//!
//! This module defines every type that travels inside a datagram. The
//! byte layout lives in the codec and registry modules; these are the
//! in-memory shapes both sides agree on.

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A peer's identity: its PEM-encoded public key, used verbatim.
///
/// The PEM text is both the address messages are sent to and the key the
/// relay files mailboxes under. Two identities are equal only if their
/// bytes are equal. No whitespace trimming, no line-ending normalization,
/// no re-encoding. A key rendered with `\r\n` is a different identity from
/// the same key rendered with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Wraps a PEM string as an identity, unchanged.
    pub fn new(pem: impl Into<String>) -> Self {
        Self(pem.into())
    }

    /// Returns the PEM text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the UTF-8 bytes that go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consumes the identity and returns the PEM text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// A short, human-readable tag for logs and listings.
    ///
    /// PEM armor lines are skipped and the tail of the key body is used,
    /// since public keys of the same algorithm share a long common prefix.
    pub fn short(&self) -> &str {
        const SHORT_LEN: usize = 16;

        let body = self
            .0
            .lines()
            .rev()
            .find(|line| !line.is_empty() && !line.starts_with("-----"))
            .unwrap_or(self.0.as_str());
        let body = body.trim_end_matches('=');

        let chars = body.chars().count();
        if chars <= SHORT_LEN {
            return body;
        }
        match body.char_indices().nth(chars - SHORT_LEN) {
            Some((start, _)) => &body[start..],
            None => body,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{}", self.short())
    }
}

impl From<&str> for Identity {
    fn from(pem: &str) -> Self {
        Self::new(pem)
    }
}

impl From<String> for Identity {
    fn from(pem: String) -> Self {
        Self(pem)
    }
}

// ---------------------------------------------------------------------------
// CommandTag
// ---------------------------------------------------------------------------

/// The 16-bit command tag that opens every frame.
///
/// Request and response frames for the same operation share a tag; the
/// [`Interaction`] tells the decoder which payload shape to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandTag(pub u16);

impl CommandTag {
    /// Deposit a ciphertext in a recipient's mailbox.
    pub const SEND_MESSAGE: Self = Self(0x0001);
    /// List every identity the relay has seen.
    pub const GET_CLIENTS: Self = Self(0x0002);
    /// Drain the caller's own mailbox.
    pub const GET_MESSAGES: Self = Self(0x0003);
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// Which side of an exchange a frame belongs to.
///
/// The relay decodes with `Request`; clients decode with `Response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// Client → relay.
    Request,
    /// Relay → client.
    Response,
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command payloads
// ---------------------------------------------------------------------------

/// One undelivered message as the relay stores and returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    /// Opaque ciphertext, exactly as the sender submitted it.
    pub ciphertext: Vec<u8>,
    /// Who deposited it.
    pub sender: Identity,
}

/// The command-specific payload of an [`Envelope`].
///
/// A tagged union over every payload shape the protocol knows. The
/// request/response pairs share a [`CommandTag`]:
///
/// | Tag              | Request        | Response      |
/// |------------------|----------------|---------------|
/// | `SEND_MESSAGE`   | `SendMessage`  | (none)        |
/// | `GET_CLIENTS`    | `GetClients`   | `ClientList`  |
/// | `GET_MESSAGES`   | `GetMessages`  | `MessageList` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Deposit `ciphertext` in `recipient`'s mailbox. Fire-and-forget.
    SendMessage {
        recipient: Identity,
        ciphertext: Vec<u8>,
    },

    /// Ask for the set of known identities.
    GetClients,

    /// The relay's answer to `GetClients`. Iteration order carries no
    /// meaning; treat it as a set.
    ClientList { clients: Vec<Identity> },

    /// Ask for (and drain) the caller's mailbox.
    GetMessages,

    /// The relay's answer to `GetMessages`, oldest message first.
    MessageList { entries: Vec<MailboxEntry> },
}

impl Command {
    /// The wire tag this command is framed under.
    pub fn tag(&self) -> CommandTag {
        match self {
            Self::SendMessage { .. } => CommandTag::SEND_MESSAGE,
            Self::GetClients | Self::ClientList { .. } => {
                CommandTag::GET_CLIENTS
            }
            Self::GetMessages | Self::MessageList { .. } => {
                CommandTag::GET_MESSAGES
            }
        }
    }

    /// A short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "SendMessage",
            Self::GetClients => "GetClients",
            Self::ClientList { .. } => "ClientList",
            Self::GetMessages => "GetMessages",
            Self::MessageList { .. } => "MessageList",
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The outer frame wrapping every datagram.
///
/// Envelopes are built per request or response and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Who sent the request. Responses echo the requester's identity.
    pub sender: Identity,

    /// Proof-of-work admission token for `SendMessage`; a free-form value
    /// for other requests, echoed unchanged in the response.
    pub token: u32,

    /// The command-specific payload.
    pub command: Command,
}

impl Envelope {
    /// Creates an envelope.
    pub fn new(sender: Identity, token: u32, command: Command) -> Self {
        Self {
            sender,
            token,
            command,
        }
    }

    /// The tag this envelope is framed under.
    pub fn tag(&self) -> CommandTag {
        self.command.tag()
    }
}

// =========================================================================
// Tests
// =========================================================================
