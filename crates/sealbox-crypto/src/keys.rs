//! Symmetric keys and HKDF purpose derivation

use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// A 256-bit symmetric key. Zeroized on drop.
///
/// Used for access keys, epoch content keys, anchor keys and the per-user
/// root key. Serializes as base64 only inside sealed records.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymmetricKey {
    #[serde(with = "sealbox_core::b64")]
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Independent subkey for `purpose`.
    pub fn derive(&self, purpose: &str) -> anyhow::Result<SymmetricKey> {
        hkdf_derive(&self.bytes, None, purpose.as_bytes()).map(Self::from_bytes)
    }

    pub fn ct_eq(&self, other: &SymmetricKey) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other)
    }
}

impl Eq for SymmetricKey {}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// HKDF-SHA256 key derivation with a domain-specific info string.
pub fn hkdf_derive(
    ikm: &[u8; KEY_SIZE],
    salt: Option<&[u8]>,
    info: &[u8],
) -> anyhow::Result<[u8; KEY_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| anyhow::anyhow!("HKDF expand failed: {e}"))?;
    Ok(okm)
}
