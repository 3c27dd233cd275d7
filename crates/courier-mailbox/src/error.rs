//! Error types for the mailbox layer.

use courier_protocol::Identity;

/// Errors that can occur while storing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// The recipient's mailbox already holds the configured maximum.
    ///
    /// Only possible when [`MailboxConfig::max_messages_per_mailbox`] is
    /// set; the default store is unbounded.
    ///
    /// [`MailboxConfig::max_messages_per_mailbox`]: crate::MailboxConfig::max_messages_per_mailbox
    #[error("mailbox for {recipient} is full ({limit} messages)")]
    Full { recipient: Identity, limit: usize },
}
