/*
    Uid - defines how node and key identifiers are hashed into the DHT keyspace.

    Responsibilities:
    Hashing (SHA-1 -> 20 bytes, base64 encoded), shared-prefix-bit counting,
    XOR distance for ordering, and validation of the wire form.

    Inputs:
    - node (address, port) pairs
    - application keys (arbitrary strings)
    - base64 strings received over the wire

    Outputs:
    - 160-bit DHT identifiers (base64 string form)
    - shared-prefix-bit counts used for bucket indexing
    - XOR distances used for k-closest ordering
*/

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Number of bits in a UID (160-bit SHA-1 digest).
pub const PREFIX_BITS: usize = 160;

/// A 160-bit DHT identifier, carried on the wire as its base64 string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wrap an already-base64-encoded string without validating it.
    ///
    /// Used only at the wire boundary where invalid input should be rejected
    /// by the caller via [`Uid::decode`], not silently coerced.
    pub fn from_raw(encoded: impl Into<String>) -> Self {
        Uid(encoded.into())
    }

    /// Derive a node's UID: `base64(SHA1(utf8(addr) ++ be_i32(port)))`.
    pub fn for_node(addr: &str, port: u16) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(addr.as_bytes());
        hasher.update((port as i32).to_be_bytes());
        let digest = hasher.finalize();
        Uid(STANDARD.encode(digest))
    }

    /// Derive a key's UID: `base64(SHA1(utf8(key)))`.
    pub fn for_key(key: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        Uid(STANDARD.encode(digest))
    }

    /// The base64 string form, as carried on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to the raw 20-byte digest. `None` if not valid base64 or the
    /// decoded length isn't exactly 20 bytes.
    pub fn decode(&self) -> Option<[u8; 20]> {
        let bytes = STANDARD.decode(&self.0).ok()?;
        bytes.try_into().ok()
    }

    /// Count of leading bits equal between two 20-byte digests.
    /// Identical arrays return `PREFIX_BITS` (160).
    pub fn shared_prefix_bits(a: &[u8; 20], b: &[u8; 20]) -> usize {
        let mut bits = 0;
        for i in 0..20 {
            let x = a[i] ^ b[i];
            if x == 0 {
                bits += 8;
                continue;
            }
            bits += x.leading_zeros() as usize;
            return bits;
        }
        bits
    }

    /// XOR distance between two 20-byte digests, used only for ordering.
    pub fn xor_distance(a: &[u8; 20], b: &[u8; 20]) -> [u8; 20] {
        let mut out = [0u8; 20];
        for i in 0..20 {
            out[i] = a[i] ^ b[i];
        }
        out
    }

    /// The bucket index `local` would place `peer` into, or `-1` when the
    /// two UIDs are identical, either fails to decode, or the decoded
    /// lengths disagree (always false here since both are fixed 20-byte
    /// arrays once decoded — the only collapse case is a decode failure).
    pub fn bucket_index(local: &Uid, peer: &Uid) -> i32 {
        let (Some(a), Some(b)) = (local.decode(), peer.decode()) else {
            return -1;
        };
        if a == b {
            return -1;
        }
        Self::shared_prefix_bits(&a, &b) as i32
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Uid(s)
    }
}
