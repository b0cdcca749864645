//! Persisted record types and where they live in the blob store
//!
//! ```text
//! user record      Address(["user", username])                  plaintext JSON, verifier-protected
//! file index       keyed(namespace, "index")                    sealed: entry key
//! file entry       keyed(namespace, "file:" + filename)         sealed: entry key
//! file header      random address, stable across uploads        sealed: access key / "header"
//! segment          Address(["segment", generation, seq])         framed JSON, body sealed: epoch key
//! grant record     Address(["share", granter, recipient, file])  signed by granter
//! rekey record     Address(["rekey", owner, recipient, file])    signed by owner
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sealbox_core::{SealboxError, SealboxResult};
use sealbox_crypto::{Address, Anchor, KdfParams, SymmetricKey};

use crate::graph::AccessGraph;

pub const RECORD_VERSION: u32 = 1;

/// Password verification record, the only per-user plaintext in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub version: u32,
    #[serde(with = "sealbox_core::b64")]
    pub salt: [u8; 16],
    pub kdf: KdfParams,
    #[serde(with = "sealbox_core::b64")]
    pub verifier: [u8; 32],
}

pub fn user_address(username: &str) -> Address {
    Address::from_parts(&["user", username])
}

/// A user's private pointer to one of their files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileEntry {
    Owned {
        header: Address,
        access_key: SymmetricKey,
    },
    Shared {
        owner: String,
        granter: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileIndex {
    pub files: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochKey {
    pub epoch: u32,
    pub key: SymmetricKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHeader {
    pub version: u32,
    pub owner: String,
    /// Names the current segment set; a fresh one per upload
    #[serde(with = "sealbox_core::b64")]
    pub generation: [u8; 16],
    pub segment_count: u64,
    pub anchor: Anchor,
    pub anchor_key: SymmetricKey,
    /// Epoch new segments are written under
    pub epoch: u32,
    pub keyring: Vec<EpochKey>,
    pub graph: AccessGraph,
}

impl FileHeader {
    pub fn epoch_key(&self, epoch: u32) -> Option<&SymmetricKey> {
        self.keyring
            .iter()
            .find(|k| k.epoch == epoch)
            .map(|k| &k.key)
    }

    pub fn current_key(&self) -> SealboxResult<&SymmetricKey> {
        self.epoch_key(self.epoch)
            .ok_or_else(|| SealboxError::integrity("header keyring lacks current epoch"))
    }
}

pub fn header_key(access_key: &SymmetricKey) -> SealboxResult<SymmetricKey> {
    Ok(access_key.derive("sealbox/header")?)
}

pub fn segment_address(generation: &[u8; 16], seq: u64) -> Address {
    Address::from_parts(&["segment", &hex::encode(generation), &seq.to_string()])
}

/// Extra AAD binding a segment body to its epoch and position.
pub fn segment_context(epoch: u32, seq: u64) -> [u8; 12] {
    let mut ctx = [0u8; 12];
    ctx[..4].copy_from_slice(&epoch.to_be_bytes());
    ctx[4..].copy_from_slice(&seq.to_be_bytes());
    ctx
}

/// What is stored at a segment address. The epoch travels in the clear so
/// the reader knows which key to try; it is also bound into the AAD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub epoch: u32,
    #[serde(with = "sealbox_core::b64")]
    pub sealed: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentBody {
    pub seq: u64,
    #[serde(with = "sealbox_core::b64")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePurpose {
    /// Original grant, signed by the granter
    Grant,
    /// Owner-issued key refresh after a revocation
    Rekey,
}

impl SharePurpose {
    fn label(self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Rekey => "rekey",
        }
    }
}

pub fn grant_address(granter: &str, recipient: &str, filename: &str) -> Address {
    Address::from_parts(&["share", granter, recipient, filename])
}

pub fn rekey_address(owner: &str, recipient: &str, filename: &str) -> Address {
    Address::from_parts(&["rekey", owner, recipient, filename])
}

/// Signed, recipient-encrypted copy of a file's access key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub purpose: SharePurpose,
    pub granter: String,
    pub recipient: String,
    pub filename: String,
    pub signer: String,
    /// Sealed box holding a JSON `SharePayload`
    #[serde(with = "sealbox_core::b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "sealbox_core::b64")]
    pub signature: Vec<u8>,
}

impl ShareRecord {
    /// Canonical bytes covered by the signature.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in [
            b"sealbox/share/v1".as_slice(),
            self.purpose.label().as_bytes(),
            self.granter.as_bytes(),
            self.recipient.as_bytes(),
            self.filename.as_bytes(),
            self.signer.as_bytes(),
            self.ciphertext.as_slice(),
        ] {
            out.extend_from_slice(&(part.len() as u64).to_be_bytes());
            out.extend_from_slice(part);
        }
        out
    }
}

/// Plaintext inside a ShareRecord's sealed box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePayload {
    pub owner: String,
    pub header: Address,
    pub access_key: SymmetricKey,
}
