//! Relay and client configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.
//!
//! ```toml
//! bind = "0.0.0.0:5001"
//! difficulty = 5
//! max_messages_per_mailbox = 1000
//! log_filter = "courier=debug,info"
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use courier_admission::{AdmissionGate, DEFAULT_DIFFICULTY, Difficulty};
use courier_mailbox::MailboxConfig;
use serde::{Deserialize, Serialize};

use crate::CourierError;

/// Default relay address, shared by the relay's bind and the client's target.
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:5001";

fn read_file(path: &Path) -> Result<String, CourierError> {
    std::fs::read_to_string(path).map_err(|e| {
        CourierError::Config(format!("cannot read {}: {e}", path.display()))
    })
}

fn gate_for(difficulty: u8) -> Result<AdmissionGate, CourierError> {
    let difficulty = Difficulty::new(difficulty)
        .map_err(|e| CourierError::Config(e.to_string()))?;
    Ok(AdmissionGate::new(difficulty))
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Settings for a relay process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Address the relay's UDP socket binds to.
    pub bind: String,

    /// Bytes read per `recv`. Longer datagrams are truncated by the OS and
    /// then rejected as malformed.
    pub recv_buffer_size: usize,

    /// Leading hex zeros a `SendMessage` token must produce.
    pub difficulty: u8,

    /// Per-recipient cap on queued messages. Unset means unbounded.
    pub max_messages_per_mailbox: Option<usize>,

    /// Default `tracing` filter, used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_RELAY_ADDR.to_string(),
            recv_buffer_size: 65_535,
            difficulty: DEFAULT_DIFFICULTY,
            max_messages_per_mailbox: None,
            log_filter: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, CourierError> {
        toml::from_str(s).map_err(|e| CourierError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CourierError> {
        Self::from_toml_str(&read_file(path.as_ref())?)
    }

    /// The admission gate this relay enforces.
    ///
    /// # Errors
    /// Returns [`CourierError::Config`] if `difficulty` is out of range.
    pub fn gate(&self) -> Result<AdmissionGate, CourierError> {
        gate_for(self.difficulty)
    }

    /// Limits for the mailbox store.
    pub fn mailbox_config(&self) -> MailboxConfig {
        MailboxConfig {
            max_messages_per_mailbox: self.max_messages_per_mailbox,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Settings for a client talking to one relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// The relay's address, as `host:port`. Host names are resolved on connect.
    pub relay: String,

    /// Local address to bind. Port 0 picks an ephemeral port.
    pub bind: String,

    /// How long to wait for a `GetClients`/`GetMessages` response.
    pub response_timeout_ms: u64,

    /// Leading hex zeros to search for when sending. Must match the relay.
    pub difficulty: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay: DEFAULT_RELAY_ADDR.to_string(),
            bind: "127.0.0.1:0".to_string(),
            response_timeout_ms: 3000,
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, CourierError> {
        toml::from_str(s).map_err(|e| CourierError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CourierError> {
        Self::from_toml_str(&read_file(path.as_ref())?)
    }

    /// Resolves the relay address.
    ///
    /// Host names such as `localhost:5001` are looked up. When a name has
    /// both IPv4 and IPv6 addresses, the one matching the family of `bind`
    /// wins, since the local socket can only reach that family.
    pub async fn relay_addr(&self) -> Result<SocketAddr, CourierError> {
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(self.relay.as_str())
            .await
            .map_err(|e| {
                CourierError::Config(format!(
                    "cannot resolve relay address {:?}: {e}",
                    self.relay
                ))
            })?
            .collect();

        let want_v4 = self
            .bind
            .parse::<SocketAddr>()
            .map_or(true, |local| local.is_ipv4());
        candidates
            .iter()
            .find(|addr| addr.is_ipv4() == want_v4)
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| {
                CourierError::Config(format!(
                    "relay address {:?} resolved to nothing",
                    self.relay
                ))
            })
    }

    /// The response deadline as a [`Duration`].
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// The admission gate used to solve outgoing sends.
    pub fn gate(&self) -> Result<AdmissionGate, CourierError> {
        gate_for(self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.bind, "127.0.0.1:5001");
        assert_eq!(config.recv_buffer_size, 65_535);
        assert_eq!(config.difficulty, 5);
        assert_eq!(config.max_messages_per_mailbox, None);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_relay_config_empty_toml_is_default() {
        let config = RelayConfig::from_toml_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_relay_config_partial_toml_keeps_other_defaults() {
        let config = RelayConfig::from_toml_str(
            "bind = \"0.0.0.0:6000\"\nmax_messages_per_mailbox = 10\n",
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:6000");
        assert_eq!(config.max_messages_per_mailbox, Some(10));
        assert_eq!(config.difficulty, 5);
        assert_eq!(config.mailbox_config().max_messages_per_mailbox, Some(10));
    }

    #[test]
    fn test_relay_config_unknown_field_rejected() {
        let err = RelayConfig::from_toml_str("difficultee = 3").unwrap_err();
        assert!(matches!(err, CourierError::Config(_)));
    }

    #[test]
    fn test_relay_config_gate_rejects_out_of_range_difficulty() {
        let config = RelayConfig {
            difficulty: 9,
            ..RelayConfig::default()
        };
        assert!(matches!(config.gate(), Err(CourierError::Config(_))));
    }

    #[test]
    fn test_relay_config_load_missing_file_is_config_error() {
        let err = RelayConfig::load("/nonexistent/courier.toml").unwrap_err();
        assert!(matches!(err, CourierError::Config(msg) if msg.contains("courier.toml")));
    }

    #[tokio::test]
    async fn test_client_config_defaults_and_helpers() {
        let config = ClientConfig::default();
        let expected: SocketAddr = "127.0.0.1:5001".parse().unwrap();
        assert_eq!(config.relay_addr().await.unwrap(), expected);
        assert_eq!(config.response_timeout(), Duration::from_secs(3));
        assert_eq!(config.gate().unwrap().difficulty().zeros(), 5);
    }

    #[tokio::test]
    async fn test_client_config_resolves_localhost() {
        let config = ClientConfig {
            relay: "localhost:5001".to_string(),
            ..ClientConfig::default()
        };
        let addr = config.relay_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert!(addr.is_ipv4());
        assert_eq!(addr.port(), 5001);
    }

    #[tokio::test]
    async fn test_client_config_bad_relay_address() {
        let config = ClientConfig {
            relay: "not an address".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.relay_addr().await, Err(CourierError::Config(_))));
    }
}
