//! Unified error type for Courier.

use std::path::PathBuf;
use std::time::Duration;

use courier_admission::AdmissionError;
use courier_mailbox::MailboxError;
use courier_protocol::ProtocolError;
use courier_transport::TransportError;

use crate::collaborators::CipherError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant auto-generates a `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed frame, unknown command).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A send failed the proof-of-work check, or no token could be found.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// The recipient's mailbox refused the message.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    /// The cipher collaborator failed to seal or open a message.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// A key file could not be read.
    #[error("failed to read key file {path}: {source}")]
    KeyStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is unreadable or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No matching response arrived before the deadline.
    ///
    /// The relay never acknowledges anything, so a lost request and a lost
    /// response look the same from here.
    #[error("no response from relay within {0:?}")]
    Timeout(Duration),

    /// The relay answered with a payload of the wrong shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// `send_to_known` was given an index outside the cached client list.
    #[error("no known client at index {index} ({known} known)")]
    UnknownClient { index: usize, known: usize },

    /// A background worker (the proof-of-work search) panicked or was
    /// cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),
}
