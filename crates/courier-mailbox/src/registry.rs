//! The client registry: the set of identities the relay has heard from.
//!
//! There is no join command. Any decoded request registers its sender, so
//! presence is inferred from traffic. Entries are never removed.

use std::collections::HashSet;

use courier_protocol::Identity;

/// The deduplicated set of known identities.
#[derive(Debug, Default, Clone)]
pub struct ClientRegistry {
    clients: HashSet<Identity>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an identity. Returns `true` the first time it is seen.
    pub fn register(&mut self, identity: &Identity) -> bool {
        if self.clients.contains(identity) {
            return false;
        }
        self.clients.insert(identity.clone());
        tracing::info!(client = %identity, total = self.clients.len(), "new client registered");
        true
    }

    /// Returns `true` if the identity has been registered.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.clients.contains(identity)
    }

    /// A copy of every registered identity, in set-iteration order.
    ///
    /// The order is unspecified and may differ between calls.
    pub fn snapshot(&self) -> Vec<Identity> {
        self.clients.iter().cloned().collect()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if nobody has registered yet.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
