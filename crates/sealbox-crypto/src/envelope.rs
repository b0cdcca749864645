//! Sealed record envelope: XChaCha20-Poly1305 over a JSON-serialized value
//!
//! Envelope format (binary):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! AAD = "sealbox/v1" || address (16 bytes) || context
//! ```
//!
//! The AAD binds every record to the address it is stored at, so a record
//! copied or swapped to a different address fails to open. `context` adds
//! further binding (segment epoch and sequence number, for instance).
//! Nothing is deserialized until the tag has verified.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use sealbox_core::{SealboxError, SealboxResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::address::Address;
use crate::keys::SymmetricKey;
use crate::{NONCE_SIZE, TAG_SIZE};

const DOMAIN: &[u8] = b"sealbox/v1";

pub fn seal<T: Serialize>(
    key: &SymmetricKey,
    address: &Address,
    value: &T,
) -> SealboxResult<Vec<u8>> {
    seal_with(key, address, &[], value)
}

pub fn seal_with<T: Serialize>(
    key: &SymmetricKey,
    address: &Address,
    context: &[u8],
    value: &T,
) -> SealboxResult<Vec<u8>> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(value).map_err(|e| anyhow::anyhow!("record serialization: {e}"))?,
    );
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let aad = build_aad(address, context);
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: &plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| anyhow::anyhow!("envelope encryption failed: {e}"))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

pub fn open<T: DeserializeOwned>(
    key: &SymmetricKey,
    address: &Address,
    sealed: &[u8],
) -> SealboxResult<T> {
    open_with(key, address, &[], sealed)
}

/// Verify and decrypt an envelope, then deserialize it.
///
/// Tag failure (wrong key, wrong address or context, any flipped byte) is an
/// integrity violation. A record that authenticates but does not parse as `T`
/// is a decode error.
pub fn open_with<T: DeserializeOwned>(
    key: &SymmetricKey,
    address: &Address,
    context: &[u8],
    sealed: &[u8],
) -> SealboxResult<T> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SealboxError::integrity(format!(
            "envelope at {address} too short: {} bytes",
            sealed.len()
        )));
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let aad = build_aad(address, context);
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| SealboxError::integrity(format!("envelope at {address} failed to verify")))?,
    );

    serde_json::from_slice(&plaintext).map_err(|e| SealboxError::Decode(e.to_string()))
}

fn build_aad(address: &Address, context: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(DOMAIN.len() + address.as_bytes().len() + context.len());
    aad.extend_from_slice(DOMAIN);
    aad.extend_from_slice(address.as_bytes());
    aad.extend_from_slice(context);
    aad
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
        count: u32,
    }

    fn note() -> Note {
        Note {
            title: "hello".into(),
            count: 3,
        }
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = SymmetricKey::generate();
        let addr = Address::derive(b"note");

        let sealed = seal(&key, &addr, &note()).unwrap();
        let opened: Note = open(&key, &addr, &sealed).unwrap();

        assert_eq!(opened, note());
    }

    #[test]
    fn test_wrong_key_is_integrity() {
        let addr = Address::derive(b"note");
        let sealed = seal(&SymmetricKey::generate(), &addr, &note()).unwrap();

        let err = open::<Note>(&SymmetricKey::generate(), &addr, &sealed).unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_moved_record_is_integrity() {
        let key = SymmetricKey::generate();
        let sealed = seal(&key, &Address::derive(b"a"), &note()).unwrap();

        let err = open::<Note>(&key, &Address::derive(b"b"), &sealed).unwrap_err();
        assert!(err.is_integrity_violation(), "address must be bound by AAD");
    }

    #[test]
    fn test_context_mismatch_is_integrity() {
        let key = SymmetricKey::generate();
        let addr = Address::derive(b"segment");
        let sealed = seal_with(&key, &addr, &1u64.to_be_bytes(), &note()).unwrap();

        assert!(open_with::<Note>(&key, &addr, &1u64.to_be_bytes(), &sealed).is_ok());
        let err = open_with::<Note>(&key, &addr, &2u64.to_be_bytes(), &sealed).unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_truncated_is_integrity() {
        let key = SymmetricKey::generate();
        let addr = Address::derive(b"note");
        let err = open::<Note>(&key, &addr, &[0u8; NONCE_SIZE + TAG_SIZE - 1]).unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let key = SymmetricKey::generate();
        let addr = Address::derive(b"note");
        let sealed = seal(&key, &addr, &"just a string").unwrap();

        let err = open::<Note>(&key, &addr, &sealed).unwrap_err();
        assert!(matches!(err, SealboxError::Decode(_)));
    }

    #[test]
    fn test_sealed_size() {
        let key = SymmetricKey::generate();
        let addr = Address::derive(b"bytes");
        let sealed = seal(&key, &addr, &42u8).unwrap();

        // nonce (24) + "42" (2) + tag (16)
        assert_eq!(sealed.len(), NONCE_SIZE + 2 + TAG_SIZE);
    }

    mod proptest_suite {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn any_flipped_byte_is_rejected(
                payload in proptest::collection::vec(any::<u8>(), 0..256),
                index in any::<prop::sample::Index>(),
                mask in 1u8..=255,
            ) {
                let key = SymmetricKey::generate();
                let addr = Address::derive(b"prop");
                let mut sealed = seal(&key, &addr, &payload).unwrap();

                let i = index.index(sealed.len());
                sealed[i] ^= mask;

                let result = open::<Vec<u8>>(&key, &addr, &sealed);
                prop_assert!(result.unwrap_err().is_integrity_violation());
            }

            #[test]
            fn roundtrip_preserves_payload(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
                let key = SymmetricKey::generate();
                let addr = Address::random();
                let sealed = seal(&key, &addr, &payload).unwrap();
                let opened: Vec<u8> = open(&key, &addr, &sealed).unwrap();
                prop_assert_eq!(opened, payload);
            }
        }
    }
}
