//! Error types for the protocol layer.
//!
//! Each crate in Courier defines its own error enum. When you see a
//! `ProtocolError`, the problem is in framing or parsing a datagram, not in
//! networking or mailbox storage.

use crate::CommandTag;

/// Errors that can occur while encoding or decoding frames.
///
/// The structural variants (`Truncated`, `LengthOverrun`, `InvalidUtf8`,
/// `TrailingBytes`) together form the "format error" class; use
/// [`ProtocolError::is_format_error`] to test for it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A fixed-width field could not be read because the buffer ended.
    #[error("truncated {field}: need {needed} bytes, have {available}")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A length prefix claims more bytes than remain in the buffer.
    #[error("{field} length {len} overruns the {remaining} remaining bytes")]
    LengthOverrun {
        field: &'static str,
        len: usize,
        remaining: usize,
    },

    /// A text field is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// Bytes were left over after the payload was fully decoded.
    #[error("{count} unexpected trailing bytes after payload")]
    TrailingBytes { count: usize },

    /// The command tag has no entry in the registry.
    #[error("unknown command tag {0}")]
    UnknownCommand(CommandTag),

    /// Two codecs were registered under the same tag.
    #[error("command tag {0} registered twice")]
    DuplicateTag(CommandTag),

    /// A variable-length field is too long for its 32-bit length prefix.
    #[error("{field} of {len} bytes does not fit a 32-bit length prefix")]
    FieldTooLarge { field: &'static str, len: usize },

    /// The message is well-formed but violates a protocol rule, e.g. a
    /// codec asked to encode a command that belongs to another tag.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Returns `true` for structural violations of the byte layout.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::LengthOverrun { .. }
                | Self::InvalidUtf8 { .. }
                | Self::TrailingBytes { .. }
        )
    }
}
