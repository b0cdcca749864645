//! sealbox-crypto: client-side cryptography for sealbox
//!
//! Nothing here touches storage. Every value the client persists is produced
//! by one of these primitives before it reaches the untrusted store.
//!
//! Key hierarchy:
//! ```text
//! Master Key (256-bit, Argon2id from password + per-user salt)
//!   ├── root      (HKDF "sealbox/root")      → file-entry sealing key, address namespace
//!   ├── signing   (HKDF "sealbox/sign")      → Ed25519 ShareRecord signatures
//!   ├── decrypt   (HKDF "sealbox/decrypt")   → X25519 sealed-box recipient key
//!   └── verifier  (HKDF "sealbox/verifier")  → BLAKE3-keyed password verifier
//!
//! Per file (random, distributed through ShareRecords):
//!   Access Key ──seals──▶ FileHeader { keyring[epoch] → content key, anchor key }
//!   Content key (epoch e) ──seals──▶ segments written during epoch e
//! ```

pub mod address;
pub mod anchor;
pub mod envelope;
pub mod identity;
pub mod kdf;
pub mod keys;
pub mod sealed;
pub mod signing;

pub use address::Address;
pub use anchor::Anchor;
pub use envelope::{open, open_with, seal, seal_with};
pub use identity::{KeyBundle, PublicKeys};
pub use kdf::{derive_master_key, generate_salt, KdfParams, MasterKey};
pub use keys::SymmetricKey;

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of a blob-store address
pub const ADDRESS_SIZE: usize = 16;

/// Size of the per-user password salt
pub const SALT_SIZE: usize = 16;
