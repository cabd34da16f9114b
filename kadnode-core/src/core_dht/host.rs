//! Host - a peer record owned by the routing table and passed over the wire.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::error::DhtError;
use super::uid::Uid;

/// A peer the local node knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
    pub port: u16,
    pub uid: Uid,
}

impl Host {
    /// Construct a Host, validating address/uid non-emptiness.
    ///
    /// If `uid` fails to decode as base64, it is re-encoded as
    /// `base64(utf8(uid))` — an input-hygiene concession for CLI/config
    /// supplied values. Internally derived UIDs always decode cleanly and
    /// must never hit this path.
    pub fn new(address: String, port: u16, uid: Uid) -> Result<Self, DhtError> {
        if address.is_empty() {
            return Err(DhtError::EmptyAddress);
        }
        if uid.as_str().is_empty() {
            return Err(DhtError::EmptyUid);
        }

        let uid = if uid.decode().is_some() {
            uid
        } else {
            Uid::from_raw(STANDARD.encode(uid.as_str().as_bytes()))
        };

        Ok(Host { address, port, uid })
    }
}
