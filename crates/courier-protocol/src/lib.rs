//! Wire protocol for Courier.
//!
//! This crate defines the "language" that clients and the relay speak:
//!
//! - **Types** ([`Envelope`], [`Command`], [`Identity`], etc.) — the
//!   structures that travel inside a datagram.
//! - **Registry** ([`CommandRegistry`]) — the table mapping a numeric
//!   command tag to the functions that encode and decode its payload.
//! - **Codec** ([`Codec`] trait, [`BinaryCodec`]) — how an envelope is
//!   framed into bytes and parsed back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while framing.
//!
//! # Frame layout
//!
//! ```text
//! [command_tag:2][identity_len:4][admission_token:4][identity][payload]
//! ```
//!
//! All integers are big-endian. The payload fills the rest of the
//! datagram; its shape depends on the command tag AND on whether the frame
//! is a request or a response (see [`Interaction`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw datagrams) and the relay
//! (mailboxes and the client registry). It knows nothing about sockets or
//! storage. Ciphertext is carried as opaque bytes and never inspected.

mod codec;
mod error;
mod registry;
mod types;
mod wire;

pub use codec::{BinaryCodec, Codec, HEADER_LEN};
pub use error::ProtocolError;
pub use registry::{
    standard_codecs, CommandCodec, CommandRegistry, DecodeFn, EncodeFn,
};
pub use types::{
    Command, CommandTag, Envelope, Identity, Interaction, MailboxEntry,
};
