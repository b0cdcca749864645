//! Anonymous public-key encryption to an X25519 recipient
//!
//! Ephemeral-static ECDH, HKDF-SHA256 over the shared secret, then
//! XChaCha20-Poly1305. Format:
//! ```text
//! [32 bytes: ephemeral public key][24 bytes: nonce][ciphertext][16 bytes: tag]
//! HKDF salt = ephemeral_pub || recipient_pub, info = "sealbox/sealed-box"
//! AAD       = ephemeral_pub || recipient_pub
//! ```
//!
//! The box is not authenticated to a sender. ShareRecords carry a separate
//! Ed25519 signature for that.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use sealbox_core::{SealboxError, SealboxResult};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::keys::hkdf_derive;
use crate::{NONCE_SIZE, TAG_SIZE};

const INFO: &[u8] = b"sealbox/sealed-box";
const PUBLIC_KEY_SIZE: usize = 32;

/// Encrypt `plaintext` so only the holder of `recipient`'s secret can read it.
pub fn seal_to(recipient: &[u8; PUBLIC_KEY_SIZE], plaintext: &[u8]) -> SealboxResult<Vec<u8>> {
    let recipient_pk = PublicKey::from(*recipient);
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_pk = PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&recipient_pk);
    if !shared.was_contributory() {
        return Err(SealboxError::InvalidInput(
            "recipient public key is a low-order point".into(),
        ));
    }

    let binding = binding(ephemeral_pk.as_bytes(), recipient);
    let key = Zeroizing::new(hkdf_derive(shared.as_bytes(), Some(binding.as_slice()), INFO)?);
    let cipher = XChaCha20Poly1305::new(&(*key).into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &binding,
            },
        )
        .map_err(|e| anyhow::anyhow!("sealed box encryption failed: {e}"))?;

    let mut out = Vec::with_capacity(PUBLIC_KEY_SIZE + NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(ephemeral_pk.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a sealed box with the recipient's static secret.
pub fn open_sealed(secret: &StaticSecret, sealed: &[u8]) -> SealboxResult<Zeroizing<Vec<u8>>> {
    if sealed.len() < PUBLIC_KEY_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(SealboxError::integrity(format!(
            "sealed box too short: {} bytes",
            sealed.len()
        )));
    }
    let (eph_bytes, rest) = sealed.split_at(PUBLIC_KEY_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

    let mut eph = [0u8; PUBLIC_KEY_SIZE];
    eph.copy_from_slice(eph_bytes);
    let ephemeral_pk = PublicKey::from(eph);
    let recipient_pk = PublicKey::from(secret);

    let shared = secret.diffie_hellman(&ephemeral_pk);
    if !shared.was_contributory() {
        return Err(SealboxError::integrity("sealed box with low-order ephemeral key"));
    }

    let binding = binding(&eph, recipient_pk.as_bytes());
    let key = Zeroizing::new(hkdf_derive(shared.as_bytes(), Some(binding.as_slice()), INFO)?);
    let cipher = XChaCha20Poly1305::new(&(*key).into());

    cipher
        .decrypt(
            XNonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: &binding,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| SealboxError::integrity("sealed box failed to verify"))
}

fn binding(ephemeral: &[u8; PUBLIC_KEY_SIZE], recipient: &[u8; PUBLIC_KEY_SIZE]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * PUBLIC_KEY_SIZE);
    out.extend_from_slice(ephemeral);
    out.extend_from_slice(recipient);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: u8) -> (StaticSecret, [u8; 32]) {
        let secret = StaticSecret::from([seed; 32]);
        let public = *PublicKey::from(&secret).as_bytes();
        (secret, public)
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (secret, public) = keypair(3);
        let sealed = seal_to(&public, b"file access key").unwrap();
        let opened = open_sealed(&secret, &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"file access key");
    }

    #[test]
    fn test_each_seal_uses_fresh_ephemeral() {
        let (_, public) = keypair(3);
        let a = seal_to(&public, b"same").unwrap();
        let b = seal_to(&public, b"same").unwrap();
        assert_ne!(a[..32], b[..32]);
    }

    #[test]
    fn test_wrong_recipient_is_integrity() {
        let (_, public) = keypair(3);
        let (other, _) = keypair(4);
        let sealed = seal_to(&public, b"secret").unwrap();
        assert!(open_sealed(&other, &sealed).unwrap_err().is_integrity_violation());
    }

    #[test]
    fn test_tampered_box_is_integrity() {
        let (secret, public) = keypair(3);
        let mut sealed = seal_to(&public, b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert!(open_sealed(&secret, &sealed).unwrap_err().is_integrity_violation());
    }

    #[test]
    fn test_low_order_recipient_rejected() {
        let err = seal_to(&[0u8; 32], b"secret").unwrap_err();
        assert!(matches!(err, SealboxError::InvalidInput(_)));
    }
}
