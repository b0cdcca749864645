//! Authenticated session: the user's keys plus handles to both services

use std::sync::Arc;

use sealbox_core::{SealboxError, SealboxResult};
use sealbox_crypto::{envelope, signing, Address, KeyBundle, SymmetricKey};
use sealbox_storage::{BlobStore, KeyDirectory};

use crate::records::{
    grant_address, header_key, rekey_address, FileEntry, FileHeader, FileIndex, ShareRecord,
    SharePayload, SharePurpose, RECORD_VERSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Collaborator,
}

/// A file resolved through the caller's entry, with its header verified.
pub(crate) struct OpenFile {
    pub header_address: Address,
    pub access_key: SymmetricKey,
    pub header: FileHeader,
    pub role: Role,
}

/// One logged-in user. Cheap to clone; holds no state beyond derived keys.
#[derive(Clone)]
pub struct Session {
    pub(crate) username: String,
    pub(crate) keys: Arc<KeyBundle>,
    pub(crate) blobs: BlobStore,
    pub(crate) directory: KeyDirectory,
    entry_key: SymmetricKey,
    namespace: SymmetricKey,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(
        username: &str,
        keys: KeyBundle,
        blobs: BlobStore,
        directory: KeyDirectory,
    ) -> SealboxResult<Self> {
        let entry_key = keys.root().derive("sealbox/entries")?;
        let namespace = keys.root().derive("sealbox/namespace")?;
        Ok(Self {
            username: username.to_string(),
            keys: Arc::new(keys),
            blobs,
            directory,
            entry_key,
            namespace,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Names of every file this user owns or has received.
    pub async fn list_files(&self) -> SealboxResult<Vec<String>> {
        Ok(self.load_index().await?.files.into_iter().collect())
    }

    // -- private namespace --------------------------------------------------

    fn entry_address(&self, filename: &str) -> Address {
        Address::keyed(&self.namespace, &format!("file:{filename}"))
    }

    fn index_address(&self) -> Address {
        Address::keyed(&self.namespace, "index")
    }

    pub(crate) async fn lookup_entry(&self, filename: &str) -> SealboxResult<Option<FileEntry>> {
        let address = self.entry_address(filename);
        match self.blobs.get(&address).await? {
            None => Ok(None),
            Some(sealed) => envelope::open(&self.entry_key, &address, &sealed).map(Some),
        }
    }

    pub(crate) async fn store_entry(&self, filename: &str, entry: &FileEntry) -> SealboxResult<()> {
        let address = self.entry_address(filename);
        let sealed = envelope::seal(&self.entry_key, &address, entry)?;
        self.blobs.put(&address, sealed).await
    }

    pub(crate) async fn load_index(&self) -> SealboxResult<FileIndex> {
        let address = self.index_address();
        let sealed = self
            .blobs
            .get(&address)
            .await?
            .ok_or_else(|| SealboxError::integrity(format!("file index of {} missing", self.username)))?;
        envelope::open(&self.entry_key, &address, &sealed)
    }

    pub(crate) async fn store_index(&self, index: &FileIndex) -> SealboxResult<()> {
        let address = self.index_address();
        let sealed = envelope::seal(&self.entry_key, &address, index)?;
        self.blobs.put(&address, sealed).await
    }

    pub(crate) async fn add_to_index(&self, filename: &str) -> SealboxResult<()> {
        let mut index = self.load_index().await?;
        if index.files.insert(filename.to_string()) {
            self.store_index(&index).await?;
        }
        Ok(())
    }

    // -- headers ------------------------------------------------------------

    pub(crate) async fn load_header(
        &self,
        address: &Address,
        access_key: &SymmetricKey,
    ) -> SealboxResult<Option<FileHeader>> {
        let Some(sealed) = self.blobs.get(address).await? else {
            return Ok(None);
        };
        let header: FileHeader = envelope::open(&header_key(access_key)?, address, &sealed)?;
        if header.version != RECORD_VERSION {
            return Err(SealboxError::integrity(format!(
                "header at {address} has version {}",
                header.version
            )));
        }
        Ok(Some(header))
    }

    pub(crate) async fn store_header(
        &self,
        address: &Address,
        access_key: &SymmetricKey,
        header: &FileHeader,
    ) -> SealboxResult<()> {
        let sealed = envelope::seal(&header_key(access_key)?, address, header)?;
        self.blobs.put(address, sealed).await
    }

    /// Follow this user's entry for `filename` to a verified header.
    pub(crate) async fn resolve(&self, filename: &str) -> SealboxResult<OpenFile> {
        match self.lookup_entry(filename).await? {
            None => Err(SealboxError::FileNotFound(filename.to_string())),
            Some(FileEntry::Owned { header, access_key }) => {
                let loaded = self.load_header(&header, &access_key).await?.ok_or_else(|| {
                    SealboxError::integrity(format!("header of owned file {filename} missing"))
                })?;
                if loaded.owner != self.username {
                    return Err(SealboxError::integrity(format!(
                        "owned file {filename} names {} as owner",
                        loaded.owner
                    )));
                }
                Ok(OpenFile {
                    header_address: header,
                    access_key,
                    header: loaded,
                    role: Role::Owner,
                })
            }
            Some(FileEntry::Shared { owner, granter }) => {
                self.resolve_shared(filename, &owner, &granter).await
            }
        }
    }

    /// Resolve a received file: the granter's record, then any newer
    /// owner-issued rekey record, then the header they point at.
    pub(crate) async fn resolve_shared(
        &self,
        filename: &str,
        owner: &str,
        granter: &str,
    ) -> SealboxResult<OpenFile> {
        let grant_addr = grant_address(granter, &self.username, filename);
        let Some(raw) = self.blobs.get(&grant_addr).await? else {
            return Err(SealboxError::PermissionDenied(format!(
                "access to {filename} has been revoked"
            )));
        };
        let grant = self
            .open_share_record(&raw, SharePurpose::Grant, granter, filename)
            .await?;
        if grant.owner != owner {
            return Err(SealboxError::integrity(format!(
                "grant for {filename} names owner {}, expected {owner}",
                grant.owner
            )));
        }

        let rekey_addr = rekey_address(owner, &self.username, filename);
        let payload = match self.blobs.get(&rekey_addr).await? {
            Some(raw) => {
                let rekey = self
                    .open_share_record(&raw, SharePurpose::Rekey, owner, filename)
                    .await?;
                if rekey.owner != owner {
                    return Err(SealboxError::integrity(format!(
                        "rekey for {filename} names owner {}",
                        rekey.owner
                    )));
                }
                rekey
            }
            None => grant,
        };

        let header = self
            .load_header(&payload.header, &payload.access_key)
            .await?
            .ok_or_else(|| SealboxError::integrity(format!("stale key for {filename}")))?;
        if header.owner != owner {
            return Err(SealboxError::integrity(format!(
                "header of {filename} names {} as owner, expected {owner}",
                header.owner
            )));
        }
        if !header.graph.contains(&self.username) {
            return Err(SealboxError::PermissionDenied(format!(
                "no longer a collaborator on {filename}"
            )));
        }
        match header.graph.granter_of(&self.username) {
            Some(recorded) if recorded == granter => {}
            recorded => {
                return Err(SealboxError::integrity(format!(
                    "grant for {filename} signed by {granter}, header records {}",
                    recorded.unwrap_or("no granter")
                )))
            }
        }

        Ok(OpenFile {
            header_address: payload.header,
            access_key: payload.access_key,
            header,
            role: Role::Collaborator,
        })
    }

    /// Verify a ShareRecord addressed to this user and open its payload.
    ///
    /// `signer` is the only principal allowed to have issued it: the granter
    /// for a grant, the owner for a rekey.
    pub(crate) async fn open_share_record(
        &self,
        raw: &[u8],
        purpose: SharePurpose,
        signer: &str,
        filename: &str,
    ) -> SealboxResult<SharePayload> {
        let record: ShareRecord = serde_json::from_slice(raw)
            .map_err(|e| SealboxError::integrity(format!("share record for {filename}: {e}")))?;
        if record.purpose != purpose
            || record.granter != signer
            || record.signer != signer
            || record.recipient != self.username
            || record.filename != filename
        {
            return Err(SealboxError::integrity(format!(
                "share record for {filename} does not match its address"
            )));
        }

        let signer_keys = self.directory.lookup(signer).await?.ok_or_else(|| {
            SealboxError::integrity(format!("share record signed by unregistered {signer}"))
        })?;
        signing::verify(
            &signer_keys.verifying,
            &record.signed_bytes(),
            &record.signature,
        )?;

        let plaintext = self.keys.open_sealed(&record.ciphertext)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| SealboxError::integrity(format!("share payload for {filename}: {e}")))
    }
}
