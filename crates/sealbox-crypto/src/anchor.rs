//! Integrity anchor: a keyed BLAKE3 chain over every committed segment
//!
//! ```text
//! a_0     = BLAKE3-keyed(k, "sealbox/anchor/genesis" || generation)
//! a_{i+1} = BLAKE3-keyed(k, a_i || seq_i (8 bytes BE) || BLAKE3(segment_i))
//! ```
//!
//! The header stores the final value. Recomputing the chain on download
//! detects dropped, reordered, duplicated or substituted segments. Appending
//! extends the stored value without reading old segments.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::keys::SymmetricKey;

const GENESIS: &[u8] = b"sealbox/anchor/genesis";

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Anchor(#[serde(with = "sealbox_core::b64")] [u8; 32]);

impl Anchor {
    pub fn genesis(key: &SymmetricKey, generation: &[u8; 16]) -> Self {
        let mut hasher = blake3::Hasher::new_keyed(key.as_bytes());
        hasher.update(GENESIS);
        hasher.update(generation);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn extend(&self, key: &SymmetricKey, seq: u64, segment: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_keyed(key.as_bytes());
        hasher.update(&self.0);
        hasher.update(&seq.to_be_bytes());
        hasher.update(blake3::hash(segment).as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn ct_eq(&self, other: &Anchor) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::fmt::Debug for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Anchor({})", hex::encode(&self.0[..8]))
    }
}
