//! # Courier
//!
//! A store-and-forward relay for end-to-end encrypted messages over UDP.
//!
//! Clients deposit ciphertext for a recipient, identified by its public key,
//! and the relay keeps it until that recipient asks for its mailbox. The
//! relay never sees plaintext. To make flooding expensive, every send must
//! carry a proof-of-work token: a number whose SHA-256 together with the
//! ciphertext starts with a run of hex zeros.
//!
//! ## Layers
//!
//! ```text
//! courier (this crate)   Relay, RelayServer, RelayClient, config
//!     ↕
//! courier-mailbox        ClientRegistry, MailboxStore
//! courier-admission      AdmissionGate (proof of work)
//!     ↕
//! courier-protocol       Envelope, Command, BinaryCodec
//!     ↕
//! courier-transport      UdpTransport
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier::prelude::*;
//!
//! # async fn demo() -> Result<(), CourierError> {
//! let server = RelayServer::builder().bind("127.0.0.1:5001").build().await?;
//! tokio::spawn(server.run());
//!
//! let mut alice = RelayClient::connect(&ClientConfig::default(), Identity::new("alice")).await?;
//! let clients = alice.get_clients().await?;
//! alice.send_to_known(0, b"note to self".to_vec()).await?;
//! let inbox = alice.get_messages().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod collaborators;
mod config;
mod error;
mod relay;
mod server;

pub use client::{EnvelopeBuilder, ReceivedMessage, RelayClient, UnopenedMessage};
pub use collaborators::{
    Cipher, CipherError, KeyDirectory, KeyStore, PlaintextCipher, PUBLIC_KEY_FILE,
};
pub use config::{ClientConfig, DEFAULT_RELAY_ADDR, RelayConfig};
pub use error::CourierError;
pub use relay::Relay;
pub use server::{RelayServer, RelayServerBuilder};

/// Common imports for relay operators and client authors.
pub mod prelude {
    pub use crate::{
        Cipher, CipherError, ClientConfig, CourierError, EnvelopeBuilder,
        KeyDirectory, KeyStore, PlaintextCipher, ReceivedMessage, Relay,
        RelayClient, RelayConfig, RelayServer, UnopenedMessage,
    };
    pub use courier_admission::{AdmissionGate, Difficulty};
    pub use courier_mailbox::MailboxConfig;
    pub use courier_protocol::{Command, Envelope, Identity, MailboxEntry};
}
