//! Per-user key bundle, re-derived from the master key on every login

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use sealbox_core::SealboxResult;

use crate::kdf::MasterKey;
use crate::keys::{hkdf_derive, SymmetricKey};
use crate::sealed;
use crate::signing::SIGNATURE_SIZE;

/// Long-term keys of one user. Never persisted; rebuilt from the password.
pub struct KeyBundle {
    root: SymmetricKey,
    verifier: SymmetricKey,
    signing: SigningKey,
    decryption: StaticSecret,
}

impl KeyBundle {
    pub fn derive(master: &MasterKey) -> anyhow::Result<Self> {
        let root = SymmetricKey::from_bytes(hkdf_derive(master.as_bytes(), None, b"sealbox/root")?);
        let verifier =
            SymmetricKey::from_bytes(hkdf_derive(master.as_bytes(), None, b"sealbox/verifier")?);
        let sign_seed = Zeroizing::new(hkdf_derive(master.as_bytes(), None, b"sealbox/sign")?);
        let decrypt_seed =
            Zeroizing::new(hkdf_derive(master.as_bytes(), None, b"sealbox/decrypt")?);

        Ok(Self {
            root,
            verifier,
            signing: SigningKey::from_bytes(&sign_seed),
            decryption: StaticSecret::from(*decrypt_seed),
        })
    }

    /// Root of the user's private namespace and file-entry keys.
    pub fn root(&self) -> &SymmetricKey {
        &self.root
    }

    /// Keys the password verifier, never anything else.
    pub fn verifier(&self) -> &SymmetricKey {
        &self.verifier
    }

    pub fn public_keys(&self) -> PublicKeys {
        PublicKeys {
            encryption: *PublicKey::from(&self.decryption).as_bytes(),
            verifying: self.signing.verifying_key().to_bytes(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing.sign(message).to_bytes()
    }

    /// Open a sealed box addressed to this user.
    pub fn open_sealed(&self, sealed: &[u8]) -> SealboxResult<Zeroizing<Vec<u8>>> {
        sealed::open_sealed(&self.decryption, sealed)
    }
}

impl std::fmt::Debug for KeyBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBundle")
            .field("public", &self.public_keys())
            .finish_non_exhaustive()
    }
}

/// What the key directory publishes for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    /// X25519 sealed-box recipient key
    #[serde(with = "sealbox_core::b64")]
    pub encryption: [u8; 32],
    /// Ed25519 verifying key
    #[serde(with = "sealbox_core::b64")]
    pub verifying: [u8; 32],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing;

    #[test]
    fn test_bundle_is_deterministic() {
        let a = KeyBundle::derive(&MasterKey::from_bytes([1u8; 32])).unwrap();
        let b = KeyBundle::derive(&MasterKey::from_bytes([1u8; 32])).unwrap();
        assert_eq!(a.public_keys(), b.public_keys());
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_bundle_keys_are_separated() {
        let bundle = KeyBundle::derive(&MasterKey::from_bytes([1u8; 32])).unwrap();
        assert_ne!(bundle.root(), bundle.verifier());
        let public = bundle.public_keys();
        assert_ne!(public.encryption, public.verifying);
    }

    #[test]
    fn test_sign_and_open() {
        let bundle = KeyBundle::derive(&MasterKey::from_bytes([2u8; 32])).unwrap();
        let public = bundle.public_keys();

        let sig = bundle.sign(b"share record");
        signing::verify(&public.verifying, b"share record", &sig).unwrap();

        let boxed = sealed::seal_to(&public.encryption, b"access key").unwrap();
        assert_eq!(bundle.open_sealed(&boxed).unwrap().as_slice(), b"access key");
    }

    #[test]
    fn test_debug_shows_only_public_half() {
        let bundle = KeyBundle::derive(&MasterKey::from_bytes([2u8; 32])).unwrap();
        let debug = format!("{bundle:?}");
        assert!(debug.contains("public"));
        assert!(!debug.contains("root"));
    }
}
