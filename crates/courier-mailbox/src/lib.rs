//! Relay-side state for Courier.
//!
//! This crate holds the two pieces of state a relay keeps in memory:
//!
//! 1. **Client registry** ([`ClientRegistry`]): every identity that has
//!    ever sent the relay a well-formed request.
//! 2. **Mailbox store** ([`MailboxStore`]): undelivered ciphertexts,
//!    queued per recipient until the recipient drains them.
//!
//! Neither is persisted. Both vanish when the relay process exits.
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay dispatcher (above)  ← decides which operation a datagram triggers
//!     ↕
//! Mailbox layer (this crate)  ← remembers who exists and what is waiting
//!     ↕
//! Protocol layer (below)  ← provides Identity, MailboxEntry
//! ```
//!
//! # Concurrency note
//!
//! Both types use plain `HashMap`/`HashSet` and are not thread-safe by
//! themselves. The relay loop owns them and touches them from one task.

mod error;
mod registry;
mod store;

pub use error::MailboxError;
pub use registry::ClientRegistry;
pub use store::{MailboxConfig, MailboxStore};
