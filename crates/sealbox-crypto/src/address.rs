//! Blob-store addressing: labels → 16-byte addresses
//!
//! Public labels are hashed with SHA-512 and truncated. Labels that would
//! leak who owns what (file names, per-user records) are addressed with a
//! keyed BLAKE3 hash under a secret namespace key instead, so the store
//! operator cannot link them back to a name.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::keys::SymmetricKey;
use crate::ADDRESS_SIZE;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(#[serde(with = "sealbox_core::b64")] [u8; ADDRESS_SIZE]);

impl Address {
    /// Hash a whole label to an address.
    pub fn derive(label: &[u8]) -> Self {
        let digest = Sha512::digest(label);
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&digest[..ADDRESS_SIZE]);
        Self(bytes)
    }

    /// Address of a multi-part label.
    ///
    /// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` map to
    /// different addresses.
    pub fn from_parts(parts: &[&str]) -> Self {
        let mut label = Vec::new();
        for part in parts {
            label.extend_from_slice(&(part.len() as u64).to_be_bytes());
            label.extend_from_slice(part.as_bytes());
        }
        Self::derive(&label)
    }

    /// Address private to holders of `namespace`.
    pub fn keyed(namespace: &SymmetricKey, label: &str) -> Self {
        let hash = blake3::keyed_hash(namespace.as_bytes(), label.as_bytes());
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&hash.as_bytes()[..ADDRESS_SIZE]);
        Self(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; ADDRESS_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; ADDRESS_SIZE];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        assert_eq!(Address::derive(b"alice"), Address::derive(b"alice"));
        assert_ne!(Address::derive(b"alice"), Address::derive(b"alice "));
    }

    #[test]
    fn test_derive_is_truncated_sha512() {
        let digest = Sha512::digest(b"label");
        assert_eq!(Address::derive(b"label").as_bytes(), &digest[..16]);
    }

    #[test]
    fn test_parts_are_unambiguous() {
        let a = Address::from_parts(&["share", "ab", "c"]);
        let b = Address::from_parts(&["share", "a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_keyed_depends_on_namespace() {
        let ns1 = SymmetricKey::from_bytes([1u8; 32]);
        let ns2 = SymmetricKey::from_bytes([2u8; 32]);
        assert_eq!(
            Address::keyed(&ns1, "file:notes"),
            Address::keyed(&ns1, "file:notes")
        );
        assert_ne!(
            Address::keyed(&ns1, "file:notes"),
            Address::keyed(&ns2, "file:notes")
        );
    }

    #[test]
    fn test_hex_roundtrip() {
        let addr = Address::random();
        let hex = addr.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(Address::from_hex(&hex), Some(addr));
        assert_eq!(Address::from_hex("zz"), None);
        assert_eq!(Address::from_hex(&hex[..30]), None);
    }

    #[test]
    fn test_serde_as_base64_string() {
        let addr = Address::from_bytes([0u8; 16]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"AAAAAAAAAAAAAAAAAAAAAA==\"");
        let parsed: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, addr);
    }
}
