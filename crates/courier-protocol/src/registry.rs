//! The command registry: tag → (encode, decode).
//!
//! The registry is an explicit table built once at startup. Each entry is a
//! [`CommandCodec`], a pair of plain function pointers that turn a
//! [`Command`] into payload bytes and back. The frame codec looks the tag
//! up here; it never matches on command kinds itself, so adding a command
//! means adding one entry to [`standard_codecs`].
//!
//! # Payload layouts
//!
//! ```text
//! SendMessage          [recipient_len:4][message_len:4][recipient][message]
//! GetClients  request  (empty)
//! GetClients  response [count:4] count × ([len:4][identity])
//! GetMessages request  (empty)
//! GetMessages response [count:4] count × ([author_len:4][message_len:4][author][message])
//! ```

use std::collections::HashMap;

use bytes::BufMut;

use crate::wire::{put_len, Reader};
use crate::{Command, CommandTag, Interaction, MailboxEntry, ProtocolError};

/// Appends a command's payload bytes to the buffer.
pub type EncodeFn = fn(&Command, &mut Vec<u8>) -> Result<(), ProtocolError>;

/// Parses payload bytes into a command, given the interaction context.
pub type DecodeFn = fn(Interaction, &[u8]) -> Result<Command, ProtocolError>;

/// One registry entry.
#[derive(Debug, Clone, Copy)]
pub struct CommandCodec {
    /// The tag this codec answers to.
    pub tag: CommandTag,
    /// A name for logs.
    pub name: &'static str,
    /// Payload encoder.
    pub encode: EncodeFn,
    /// Payload decoder.
    pub decode: DecodeFn,
}

/// Maps command tags to their payload codecs.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    codecs: HashMap<CommandTag, CommandCodec>,
}

impl CommandRegistry {
    /// Builds a registry from a list of codecs.
    ///
    /// # Errors
    /// Returns [`ProtocolError::DuplicateTag`] if two codecs share a tag.
    pub fn new(
        codecs: impl IntoIterator<Item = CommandCodec>,
    ) -> Result<Self, ProtocolError> {
        let mut table = HashMap::new();
        for codec in codecs {
            if table.insert(codec.tag, codec).is_some() {
                return Err(ProtocolError::DuplicateTag(codec.tag));
            }
        }
        Ok(Self { codecs: table })
    }

    /// The registry of every command this protocol version knows.
    pub fn standard() -> Self {
        // The standard table is a fixed list; a duplicate is a programming
        // error caught by the unit tests below.
        Self::new(standard_codecs()).expect("standard command tags are unique")
    }

    /// Looks up the codec for a tag.
    pub fn get(&self, tag: CommandTag) -> Option<&CommandCodec> {
        self.codecs.get(&tag)
    }

    /// Returns `true` if the tag has a codec.
    pub fn contains(&self, tag: CommandTag) -> bool {
        self.codecs.contains_key(&tag)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if no tags are registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Encodes a command's payload using the codec for its tag.
    pub fn encode_payload(
        &self,
        command: &Command,
        buf: &mut Vec<u8>,
    ) -> Result<(), ProtocolError> {
        let tag = command.tag();
        let codec = self.get(tag).ok_or(ProtocolError::UnknownCommand(tag))?;
        (codec.encode)(command, buf)
    }

    /// Decodes a payload using the codec registered for `tag`.
    pub fn decode_payload(
        &self,
        tag: CommandTag,
        interaction: Interaction,
        payload: &[u8],
    ) -> Result<Command, ProtocolError> {
        let codec = self.get(tag).ok_or(ProtocolError::UnknownCommand(tag))?;
        (codec.decode)(interaction, payload).inspect_err(|e| {
            tracing::debug!(
                command = codec.name,
                %interaction,
                len = payload.len(),
                error = %e,
                "payload rejected"
            );
        })
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Every codec this protocol version ships with.
pub fn standard_codecs() -> [CommandCodec; 3] {
    [
        CommandCodec {
            tag: CommandTag::SEND_MESSAGE,
            name: "SendMessage",
            encode: encode_send_message,
            decode: decode_send_message,
        },
        CommandCodec {
            tag: CommandTag::GET_CLIENTS,
            name: "GetClients",
            encode: encode_get_clients,
            decode: decode_get_clients,
        },
        CommandCodec {
            tag: CommandTag::GET_MESSAGES,
            name: "GetMessages",
            encode: encode_get_messages,
            decode: decode_get_messages,
        },
    ]
}

fn mismatch(codec: &str, command: &Command) -> ProtocolError {
    ProtocolError::InvalidMessage(format!(
        "{codec} codec cannot encode {}",
        command.name()
    ))
}

// ---------------------------------------------------------------------------
// SendMessage
// ---------------------------------------------------------------------------

fn encode_send_message(
    command: &Command,
    buf: &mut Vec<u8>,
) -> Result<(), ProtocolError> {
    let Command::SendMessage {
        recipient,
        ciphertext,
    } = command
    else {
        return Err(mismatch("SendMessage", command));
    };

    put_len(buf, recipient.as_bytes().len(), "recipient")?;
    put_len(buf, ciphertext.len(), "message")?;
    buf.put_slice(recipient.as_bytes());
    buf.put_slice(ciphertext);
    Ok(())
}

fn decode_send_message(
    interaction: Interaction,
    payload: &[u8],
) -> Result<Command, ProtocolError> {
    // SendMessage has no response; a response-context frame is a misuse.
    if interaction == Interaction::Response {
        return Err(ProtocolError::InvalidMessage(
            "SendMessage has no response payload".into(),
        ));
    }

    let mut r = Reader::new(payload);
    let recipient_len = r.read_len("recipient_len")?;
    let message_len = r.read_len("message_len")?;
    let recipient = r.take_identity(recipient_len, "recipient")?;
    let ciphertext = r.take(message_len, "message")?.to_vec();
    r.finish()?;

    Ok(Command::SendMessage {
        recipient,
        ciphertext,
    })
}

// ---------------------------------------------------------------------------
// GetClients
// ---------------------------------------------------------------------------

fn encode_get_clients(
    command: &Command,
    buf: &mut Vec<u8>,
) -> Result<(), ProtocolError> {
    match command {
        Command::GetClients => Ok(()),
        Command::ClientList { clients } => {
            put_len(buf, clients.len(), "client count")?;
            for client in clients {
                put_len(buf, client.as_bytes().len(), "identity")?;
                buf.put_slice(client.as_bytes());
            }
            Ok(())
        }
        other => Err(mismatch("GetClients", other)),
    }
}

fn decode_get_clients(
    interaction: Interaction,
    payload: &[u8],
) -> Result<Command, ProtocolError> {
    let mut r = Reader::new(payload);
    match interaction {
        Interaction::Request => {
            r.finish()?;
            Ok(Command::GetClients)
        }
        Interaction::Response => {
            let count = r.read_len("client count")?;
            // Each entry is at least 4 bytes; cap the preallocation so a
            // forged count cannot reserve memory the payload can't back.
            let mut clients = Vec::with_capacity(count.min(r.remaining() / 4));
            for _ in 0..count {
                let len = r.read_len("identity_len")?;
                clients.push(r.take_identity(len, "identity")?);
            }
            r.finish()?;
            Ok(Command::ClientList { clients })
        }
    }
}

// ---------------------------------------------------------------------------
// GetMessages
// ---------------------------------------------------------------------------

fn encode_get_messages(
    command: &Command,
    buf: &mut Vec<u8>,
) -> Result<(), ProtocolError> {
    match command {
        Command::GetMessages => Ok(()),
        Command::MessageList { entries } => {
            put_len(buf, entries.len(), "message count")?;
            for entry in entries {
                put_len(buf, entry.sender.as_bytes().len(), "author")?;
                put_len(buf, entry.ciphertext.len(), "message")?;
                buf.put_slice(entry.sender.as_bytes());
                buf.put_slice(&entry.ciphertext);
            }
            Ok(())
        }
        other => Err(mismatch("GetMessages", other)),
    }
}

fn decode_get_messages(
    interaction: Interaction,
    payload: &[u8],
) -> Result<Command, ProtocolError> {
    let mut r = Reader::new(payload);
    match interaction {
        Interaction::Request => {
            r.finish()?;
            Ok(Command::GetMessages)
        }
        Interaction::Response => {
            let count = r.read_len("message count")?;
            let mut entries = Vec::with_capacity(count.min(r.remaining() / 8));
            for _ in 0..count {
                let author_len = r.read_len("author_len")?;
                let message_len = r.read_len("message_len")?;
                let sender = r.take_identity(author_len, "author")?;
                let ciphertext = r.take(message_len, "message")?.to_vec();
                entries.push(MailboxEntry { ciphertext, sender });
            }
            r.finish()?;
            Ok(Command::MessageList { entries })
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Identity;

    fn identity(s: &str) -> Identity {
        Identity::new(s)
    }

    fn encode(command: &Command) -> Vec<u8> {
        let mut buf = Vec::new();
        CommandRegistry::standard()
            .encode_payload(command, &mut buf)
            .expect("encode");
        buf
    }

    // =====================================================================
    // Construction
    // =====================================================================

    #[test]
    fn test_standard_registry_has_three_commands() {
        let registry = CommandRegistry::standard();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(CommandTag::SEND_MESSAGE));
        assert!(registry.contains(CommandTag::GET_CLIENTS));
        assert!(registry.contains(CommandTag::GET_MESSAGES));
        assert!(!registry.contains(CommandTag(0x0004)));
    }

    #[test]
    fn test_new_rejects_duplicate_tag() {
        let [send, clients, _] = standard_codecs();
        let dup = CommandCodec {
            name: "Impostor",
            ..send
        };
        let err = CommandRegistry::new([send, clients, dup]).unwrap_err();
        assert_eq!(err, ProtocolError::DuplicateTag(CommandTag::SEND_MESSAGE));
    }

    #[test]
    fn test_new_accepts_extension_codec() {
        fn encode_ping(_: &Command, _: &mut Vec<u8>) -> Result<(), ProtocolError> {
            Ok(())
        }
        fn decode_ping(_: Interaction, _: &[u8]) -> Result<Command, ProtocolError> {
            Ok(Command::GetClients)
        }

        let ping = CommandCodec {
            tag: CommandTag(0x0100),
            name: "Ping",
            encode: encode_ping,
            decode: decode_ping,
        };
        let registry = CommandRegistry::new(
            standard_codecs().into_iter().chain([ping]),
        )
        .expect("unique tags");
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get(CommandTag(0x0100)).unwrap().name, "Ping");
    }

    #[test]
    fn test_standard_codec_names_match_command_names() {
        let registry = CommandRegistry::standard();
        for command in [Command::GetClients, Command::GetMessages] {
            let codec = registry.get(command.tag()).unwrap();
            assert_eq!(codec.name, command.name());
        }
        assert_eq!(
            registry.get(CommandTag::SEND_MESSAGE).unwrap().name,
            "SendMessage"
        );
    }

    #[test]
    fn test_decode_payload_passes_codec_error_through() {
        let err = CommandRegistry::standard()
            .decode_payload(CommandTag::GET_CLIENTS, Interaction::Request, &[0xAB])
            .unwrap_err();
        assert_eq!(err, ProtocolError::TrailingBytes { count: 1 });
    }

    #[test]
    fn test_decode_unknown_tag_is_unknown_command() {
        let registry = CommandRegistry::standard();
        let err = registry
            .decode_payload(CommandTag(0x7777), Interaction::Request, &[])
            .unwrap_err();
        assert_eq!(err, ProtocolError::UnknownCommand(CommandTag(0x7777)));
    }

    #[test]
    fn test_encode_with_empty_registry_is_unknown_command() {
        let registry = CommandRegistry::new(Vec::new()).unwrap();
        assert!(registry.is_empty());
        let err = registry
            .encode_payload(&Command::GetClients, &mut Vec::new())
            .unwrap_err();
        assert_eq!(err, ProtocolError::UnknownCommand(CommandTag::GET_CLIENTS));
    }

    // =====================================================================
    // SendMessage layout
    // =====================================================================

    #[test]
    fn test_send_message_layout_is_lengths_then_bytes() {
        let bytes = encode(&Command::SendMessage {
            recipient: identity("bob"),
            ciphertext: vec![0xAA, 0xBB],
        });
        assert_eq!(
            bytes,
            [0, 0, 0, 3, 0, 0, 0, 2, b'b', b'o', b'b', 0xAA, 0xBB]
        );
    }

    #[test]
    fn test_send_message_decode_round_trips() {
        let cmd = Command::SendMessage {
            recipient: identity("-----BEGIN PUBLIC KEY-----\nabc\n"),
            ciphertext: (0..=255).collect(),
        };
        let bytes = encode(&cmd);
        let decoded =
            decode_send_message(Interaction::Request, &bytes).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_send_message_empty_ciphertext_round_trips() {
        let cmd = Command::SendMessage {
            recipient: identity("bob"),
            ciphertext: vec![],
        };
        let decoded =
            decode_send_message(Interaction::Request, &encode(&cmd)).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_send_message_message_len_overrun_is_format_error() {
        // recipient_len = 1, message_len = 100, but only 2 bytes follow.
        let bytes = [0, 0, 0, 1, 0, 0, 0, 100, b'x', 0x01];
        let err =
            decode_send_message(Interaction::Request, &bytes).unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(
            err,
            ProtocolError::LengthOverrun { field: "message", .. }
        ));
    }

    #[test]
    fn test_send_message_trailing_bytes_rejected() {
        let mut bytes = encode(&Command::SendMessage {
            recipient: identity("bob"),
            ciphertext: vec![1],
        });
        bytes.push(0xFF);
        let err =
            decode_send_message(Interaction::Request, &bytes).unwrap_err();
        assert_eq!(err, ProtocolError::TrailingBytes { count: 1 });
    }

    #[test]
    fn test_send_message_codec_rejects_foreign_command() {
        let err =
            encode_send_message(&Command::GetMessages, &mut Vec::new())
                .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    // =====================================================================
    // GetClients layout
    // =====================================================================

    #[test]
    fn test_get_clients_request_is_empty() {
        assert!(encode(&Command::GetClients).is_empty());
        assert_eq!(
            decode_get_clients(Interaction::Request, &[]).unwrap(),
            Command::GetClients
        );
    }

    #[test]
    fn test_get_clients_request_with_payload_rejected() {
        let err = decode_get_clients(Interaction::Request, &[0]).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_get_clients_response_layout() {
        let bytes = encode(&Command::ClientList {
            clients: vec![identity("a"), identity("bc")],
        });
        assert_eq!(
            bytes,
            [0, 0, 0, 2, 0, 0, 0, 1, b'a', 0, 0, 0, 2, b'b', b'c']
        );
    }

    #[test]
    fn test_get_clients_response_round_trips_empty_list() {
        let cmd = Command::ClientList { clients: vec![] };
        let bytes = encode(&cmd);
        assert_eq!(bytes, [0, 0, 0, 0]);
        assert_eq!(
            decode_get_clients(Interaction::Response, &bytes).unwrap(),
            cmd
        );
    }

    #[test]
    fn test_get_clients_response_forged_count_is_format_error() {
        // Claims a billion entries but carries none.
        let bytes = [0x3B, 0x9A, 0xCA, 0x00];
        let err =
            decode_get_clients(Interaction::Response, &bytes).unwrap_err();
        assert!(err.is_format_error());
    }

    // =====================================================================
    // GetMessages layout
    // =====================================================================

    #[test]
    fn test_get_messages_response_layout_puts_message_after_author() {
        let bytes = encode(&Command::MessageList {
            entries: vec![MailboxEntry {
                ciphertext: vec![0x01, 0x02],
                sender: identity("al"),
            }],
        });
        assert_eq!(
            bytes,
            [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 2, b'a', b'l', 0x01, 0x02]
        );
    }

    #[test]
    fn test_get_messages_response_round_trips_in_order() {
        let cmd = Command::MessageList {
            entries: vec![
                MailboxEntry {
                    ciphertext: b"A".to_vec(),
                    sender: identity("x"),
                },
                MailboxEntry {
                    ciphertext: b"B".to_vec(),
                    sender: identity("y"),
                },
                MailboxEntry {
                    ciphertext: vec![],
                    sender: identity("x"),
                },
            ],
        };
        let decoded =
            decode_get_messages(Interaction::Response, &encode(&cmd))
                .unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_get_messages_response_truncated_entry_is_format_error() {
        // count = 1, author_len present, message_len missing.
        let bytes = [0, 0, 0, 1, 0, 0, 0, 2];
        let err =
            decode_get_messages(Interaction::Response, &bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { .. }));
    }

    #[test]
    fn test_get_messages_request_decodes_from_empty_payload() {
        assert_eq!(
            decode_get_messages(Interaction::Request, &[]).unwrap(),
            Command::GetMessages
        );
    }
}
