//! sealbox-client: end-to-end encrypted file sharing over untrusted storage
//!
//! A [`Client`] holds handles to the blob store and the key directory. It
//! creates accounts and logs users in; everything else happens on the
//! returned [`Session`]:
//!
//! ```text
//! Client::create_account / authenticate ─▶ Session
//!   upload · download · append                      (file.rs)
//!   share · receive · revoke · collaborators        (sharing.rs)
//!   list_files                                      (session.rs)
//! ```
//!
//! Every byte read back from either service is verified before use. A
//! failed check is reported as `SealboxError::IntegrityViolation` and
//! logged on the `sealbox::tamper` target.

pub mod file;
pub mod graph;
pub mod identity;
pub mod records;
pub mod session;
pub mod sharing;

pub use graph::{AccessGraph, Grant};
pub use session::{Role, Session};

use sealbox_core::{SealboxConfig, SealboxError, SealboxResult};
use sealbox_crypto::{KdfParams, KeyBundle};
use sealbox_storage::{build_operator, check_health, BlobStore, KeyDirectory};

#[derive(Clone)]
pub struct Client {
    pub(crate) blobs: BlobStore,
    pub(crate) directory: KeyDirectory,
    pub(crate) kdf: KdfParams,
}

impl Client {
    pub fn new(blobs: BlobStore, directory: KeyDirectory) -> Self {
        Self {
            blobs,
            directory,
            kdf: KdfParams::default(),
        }
    }

    /// Password KDF cost for accounts created from now on.
    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn from_config(config: &SealboxConfig) -> SealboxResult<Self> {
        let blobs = build_operator(&config.storage)
            .map_err(|e| SealboxError::Config(format!("blob store: {e:#}")))?;
        let directory = build_operator(&config.directory)
            .map_err(|e| SealboxError::Config(format!("key directory: {e:#}")))?;
        let kdf = KdfParams::from(&config.crypto);
        kdf.validate()
            .map_err(|e| SealboxError::Config(format!("crypto: {e}")))?;

        Ok(Self::new(BlobStore::new(blobs), KeyDirectory::new(directory)).with_kdf_params(kdf))
    }

    /// The untrusted blob store this client talks to.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Confirm both services answer.
    pub async fn check_health(&self) -> SealboxResult<()> {
        check_health(self.blobs.operator())
            .await
            .map_err(|e| SealboxError::Storage(format!("blob store: {e:#}")))?;
        check_health(self.directory.operator())
            .await
            .map_err(|e| SealboxError::Storage(format!("key directory: {e:#}")))
    }

    pub(crate) fn session(&self, username: &str, keys: KeyBundle) -> SealboxResult<Session> {
        Session::new(
            username,
            keys,
            self.blobs.clone(),
            self.directory.clone(),
        )
    }
}
