//! Configuration loading for the DHT node
//!
//! Reads the JSON configuration file that seeds a node's listen address,
//! listen port, and optional bootstrap peer. The local node UID is derived
//! from `addr`/`port`, never configured directly.

use serde::{Deserialize, Serialize};

mod error;

pub use error::ConfigError;

/// Node configuration as read from the JSON config file.
///
/// Exactly the four keys below are accepted; any superfluous key causes
/// deserialization to fail (`#[serde(deny_unknown_fields)]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Address this node listens on.
    pub addr: String,

    /// Port this node listens on.
    pub port: u16,

    /// Bootstrap peer address, empty if this node starts alone.
    #[serde(rename = "boot-addr", default)]
    pub boot_addr: String,

    /// Bootstrap peer port, 0 if this node starts alone.
    #[serde(rename = "boot-port", default)]
    pub boot_port: u16,
}

impl NodeConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Whether this node was configured with a bootstrap peer.
    pub fn has_bootstrap(&self) -> bool {
        !self.boot_addr.is_empty() && self.boot_port > 0
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.is_empty() {
            return Err(ConfigError::ValidationFailed("addr must not be empty".to_string()));
        }
        Ok(())
    }
}
