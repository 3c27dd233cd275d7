//! Narrow seams to the pieces Courier does not implement itself.
//!
//! The relay never looks inside a ciphertext and the client never generates
//! keys. Both are delegated to implementations of the traits here:
//!
//! - [`Cipher`] seals plaintext for a recipient and opens ciphertext from
//!   a sender.
//! - [`KeyStore`] produces the local [`Identity`] by name.

use std::path::{Path, PathBuf};

use courier_protocol::Identity;

use crate::CourierError;

/// File name of the public key inside an identity directory.
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";

/// Error reported by a [`Cipher`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cipher failed: {0}")]
pub struct CipherError(pub String);

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

/// End-to-end encryption between two identities.
///
/// Implementations must be `Send + Sync` so a client can be shared between
/// tasks.
pub trait Cipher: Send + Sync {
    /// Encrypts `plaintext` so only `recipient` can read it.
    fn seal(
        &self,
        plaintext: &[u8],
        recipient: &Identity,
    ) -> Result<Vec<u8>, CipherError>;

    /// Decrypts a ciphertext that `sender` deposited for us.
    fn open(
        &self,
        ciphertext: &[u8],
        sender: &Identity,
    ) -> Result<Vec<u8>, CipherError>;
}

/// A cipher that does nothing. Development and tests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCipher;

impl Cipher for PlaintextCipher {
    fn seal(
        &self,
        plaintext: &[u8],
        _recipient: &Identity,
    ) -> Result<Vec<u8>, CipherError> {
        Ok(plaintext.to_vec())
    }

    fn open(
        &self,
        ciphertext: &[u8],
        _sender: &Identity,
    ) -> Result<Vec<u8>, CipherError> {
        Ok(ciphertext.to_vec())
    }
}

// ---------------------------------------------------------------------------
// KeyStore
// ---------------------------------------------------------------------------

/// Loads the local identity.
pub trait KeyStore {
    /// Returns the identity stored under `name`.
    fn load_identity(&self, name: &str) -> Result<Identity, CourierError>;
}

/// A directory of identities, one subdirectory per name:
///
/// ```text
/// <root>/
///   alice/public_key.pem
///   bob/public_key.pem
/// ```
///
/// The PEM text is returned byte for byte, trailing newline included.
#[derive(Debug, Clone)]
pub struct KeyDirectory {
    root: PathBuf,
}

impl KeyDirectory {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the public key for `name` lives.
    pub fn public_key_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(PUBLIC_KEY_FILE)
    }
}

impl KeyStore for KeyDirectory {
    fn load_identity(&self, name: &str) -> Result<Identity, CourierError> {
        let path = self.public_key_path(name);
        let pem = std::fs::read_to_string(&path)
            .map_err(|source| CourierError::KeyStore { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), "identity loaded");
        Ok(Identity::new(pem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_cipher_is_identity_transform() {
        let cipher = PlaintextCipher;
        let peer = Identity::new("peer");
        let sealed = cipher.seal(b"hello", &peer).unwrap();
        assert_eq!(sealed, b"hello");
        assert_eq!(cipher.open(&sealed, &peer).unwrap(), b"hello");
    }

    #[test]
    fn test_key_directory_path_layout() {
        let store = KeyDirectory::new("/keys");
        assert_eq!(
            store.public_key_path("alice"),
            PathBuf::from("/keys/alice/public_key.pem")
        );
    }

    #[test]
    fn test_key_directory_loads_pem_verbatim() {
        let root = std::env::temp_dir()
            .join(format!("courier-keys-{}", std::process::id()));
        let dir = root.join("alice");
        std::fs::create_dir_all(&dir).unwrap();
        let pem = "-----BEGIN PUBLIC KEY-----\nABC=\n-----END PUBLIC KEY-----\n";
        std::fs::write(dir.join(PUBLIC_KEY_FILE), pem).unwrap();

        let identity = KeyDirectory::new(&root).load_identity("alice").unwrap();
        assert_eq!(identity.as_str(), pem);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_key_directory_missing_key_reports_path() {
        let store = KeyDirectory::new("/nonexistent-courier-keys");
        let err = store.load_identity("bob").unwrap_err();
        match err {
            CourierError::KeyStore { path, .. } => {
                assert!(path.ends_with("bob/public_key.pem"));
            }
            other => panic!("expected KeyStore error, got {other:?}"),
        }
    }
}
