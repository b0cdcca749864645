//! Ed25519 signature verification against directory-published keys

use ed25519_dalek::{Signature, VerifyingKey};
use sealbox_core::{SealboxError, SealboxResult};

pub const SIGNATURE_SIZE: usize = 64;

/// Strictly verify `signature` over `message`.
///
/// Malformed keys, malformed signatures and bad signatures all surface as
/// integrity violations: each can only come from the untrusted store.
pub fn verify(verifying_key: &[u8; 32], message: &[u8], signature: &[u8]) -> SealboxResult<()> {
    let key = VerifyingKey::from_bytes(verifying_key)
        .map_err(|_| SealboxError::integrity("malformed verifying key"))?;
    let signature = Signature::from_slice(signature)
        .map_err(|_| SealboxError::integrity("malformed signature"))?;
    key.verify_strict(message, &signature)
        .map_err(|_| SealboxError::integrity("signature check failed"))
}
