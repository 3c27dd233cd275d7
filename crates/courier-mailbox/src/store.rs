//! The mailbox store: per-recipient FIFO queues of undelivered messages.
//!
//! ## Lifecycle of a mailbox
//!
//! ```text
//! (absent) ──append()──→ [A] ──append()──→ [A, B] ──drain()──→ (absent)
//! ```
//!
//! A mailbox comes into being on the first accepted send to its owner and
//! disappears when its owner drains it. There is no partial read and no
//! way to look at messages without taking them.

use std::collections::{HashMap, VecDeque};

use courier_protocol::{Identity, MailboxEntry};

use crate::MailboxError;

// ---------------------------------------------------------------------------
// MailboxConfig
// ---------------------------------------------------------------------------

/// Limits applied by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxConfig {
    /// Maximum queued messages per recipient.
    ///
    /// `None` (the default) means unbounded: a mailbox whose owner never
    /// drains it grows without limit. Setting a cap makes the store refuse
    /// further sends to a full mailbox instead.
    pub max_messages_per_mailbox: Option<usize>,
}

// ---------------------------------------------------------------------------
// MailboxStore
// ---------------------------------------------------------------------------

/// Maps each recipient to its queue of pending messages.
#[derive(Debug, Default)]
pub struct MailboxStore {
    mailboxes: HashMap<Identity, VecDeque<MailboxEntry>>,
    config: MailboxConfig,
}

impl MailboxStore {
    /// Creates an empty store with the given limits.
    pub fn new(config: MailboxConfig) -> Self {
        Self {
            mailboxes: HashMap::new(),
            config,
        }
    }

    /// Queues a message at the tail of `recipient`'s mailbox.
    ///
    /// Callers must only append after the sender's admission token has been
    /// verified; the store itself does not check.
    ///
    /// # Errors
    /// Returns [`MailboxError::Full`] if a cap is configured and reached.
    pub fn append(
        &mut self,
        recipient: Identity,
        ciphertext: Vec<u8>,
        sender: Identity,
    ) -> Result<(), MailboxError> {
        if let Some(limit) = self.config.max_messages_per_mailbox {
            if self.pending(&recipient) >= limit {
                return Err(MailboxError::Full { recipient, limit });
            }
        }

        let queue = self.mailboxes.entry(recipient).or_default();
        queue.push_back(MailboxEntry { ciphertext, sender });
        Ok(())
    }

    /// Removes and returns every message for `identity`, oldest first.
    ///
    /// A second call with no sends in between returns an empty vector.
    pub fn drain(&mut self, identity: &Identity) -> Vec<MailboxEntry> {
        self.mailboxes
            .remove(identity)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Number of messages waiting for `identity`.
    pub fn pending(&self, identity: &Identity) -> usize {
        self.mailboxes.get(identity).map_or(0, VecDeque::len)
    }

    /// Number of messages waiting across all mailboxes.
    pub fn total_pending(&self) -> usize {
        self.mailboxes.values().map(VecDeque::len).sum()
    }

    /// Number of non-empty mailboxes.
    pub fn mailbox_count(&self) -> usize {
        self.mailboxes.len()
    }

    /// The limits this store enforces.
    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }
}

// =========================================================================
// Tests
// =========================================================================
