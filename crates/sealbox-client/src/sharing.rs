//! Share, receive and revoke
//!
//! Grants are signed by whoever made them and sealed to the recipient. After
//! a revocation the owner cannot re-sign other people's grants, so remaining
//! collaborators get an owner-signed rekey record next to their grant;
//! readers prefer it when present.

use sealbox_core::{SealboxError, SealboxResult};
use sealbox_crypto::{sealed, Address, PublicKeys, SymmetricKey};

use crate::graph::Grant;
use crate::records::{
    grant_address, rekey_address, EpochKey, FileEntry, ShareRecord, SharePayload, SharePurpose,
};
use crate::session::{OpenFile, Role, Session};

impl Session {
    /// Give `recipient` read and append access to `filename`.
    ///
    /// Owners and collaborators may share. The grant goes into the access
    /// graph before the record is written, so an interrupted share can
    /// still be revoked.
    pub async fn share(&self, filename: &str, recipient: &str) -> SealboxResult<()> {
        if recipient.is_empty() {
            return Err(SealboxError::InvalidInput("recipient must not be empty".into()));
        }
        let OpenFile {
            header_address,
            access_key,
            mut header,
            role,
        } = self.resolve(filename).await?;

        if recipient == self.username || recipient == header.owner {
            return Err(SealboxError::InvalidInput(format!(
                "{recipient} already has access to {filename}"
            )));
        }
        if role == Role::Collaborator && !header.graph.contains(&self.username) {
            return Err(SealboxError::PermissionDenied(format!(
                "not a collaborator on {filename}"
            )));
        }
        if let Some(existing) = header.graph.granter_of(recipient) {
            if existing != self.username {
                return Err(SealboxError::PermissionDenied(format!(
                    "{recipient} was granted {filename} by {existing}"
                )));
            }
        }

        let recipient_keys = self
            .directory
            .lookup(recipient)
            .await?
            .ok_or_else(|| SealboxError::UnknownRecipient(recipient.to_string()))?;

        header.graph.grant(recipient, &self.username);
        self.store_header(&header_address, &access_key, &header).await?;

        let payload = SharePayload {
            owner: header.owner.clone(),
            header: header_address,
            access_key,
        };
        let record = self.sign_record(SharePurpose::Grant, recipient, filename, &recipient_keys, &payload)?;
        self.put_record(&grant_address(&self.username, recipient, filename), &record)
            .await?;

        tracing::info!(user = %self.username, file = %filename, recipient = %recipient, "file shared");
        Ok(())
    }

    /// Accept a file `sender` shared with this user under the same name.
    pub async fn receive(&self, filename: &str, sender: &str) -> SealboxResult<()> {
        if filename.is_empty() || sender.is_empty() {
            return Err(SealboxError::InvalidInput(
                "filename and sender must not be empty".into(),
            ));
        }

        match self.lookup_entry(filename).await? {
            None => {}
            Some(FileEntry::Owned { .. }) => {
                return Err(SealboxError::FileExists(filename.to_string()))
            }
            // Re-receiving from the same granter refreshes the entry.
            Some(FileEntry::Shared { granter, .. }) if granter == sender => {}
            Some(FileEntry::Shared { owner, granter }) => {
                match self.resolve_shared(filename, &owner, &granter).await {
                    Ok(_) => return Err(SealboxError::FileExists(filename.to_string())),
                    Err(e) => {
                        tracing::debug!(file = %filename, error = %e, "replacing inaccessible shared entry");
                    }
                }
            }
        }

        let Some(raw) = self
            .blobs
            .get(&grant_address(sender, &self.username, filename))
            .await?
        else {
            return Err(SealboxError::NoSuchShare);
        };
        let payload = self
            .open_share_record(&raw, SharePurpose::Grant, sender, filename)
            .await?;

        // Checks owner, header and any rekey before anything is committed.
        self.resolve_shared(filename, &payload.owner, sender).await?;

        self.store_entry(
            filename,
            &FileEntry::Shared {
                owner: payload.owner.clone(),
                granter: sender.to_string(),
            },
        )
        .await?;
        self.add_to_index(filename).await?;

        tracing::info!(user = %self.username, file = %filename, sender = %sender, owner = %payload.owner, "share received");
        Ok(())
    }

    /// Cut `old_recipient`, and everyone who got access through them, off
    /// from future versions of `filename`.
    ///
    /// Rotates the access key and opens a new content epoch. Segments
    /// already written are not re-encrypted.
    pub async fn revoke(&self, filename: &str, old_recipient: &str) -> SealboxResult<()> {
        let OpenFile {
            header_address: old_address,
            mut header,
            role,
            ..
        } = self.resolve(filename).await?;

        if role != Role::Owner {
            return Err(SealboxError::PermissionDenied(format!(
                "only the owner can revoke access to {filename}"
            )));
        }
        if !header.graph.contains(old_recipient) {
            return Err(SealboxError::NotShared(old_recipient.to_string()));
        }

        let removed = header.graph.revoke(old_recipient);
        let epoch = header
            .epoch
            .checked_add(1)
            .ok_or_else(|| SealboxError::InvalidInput("key epoch exhausted".into()))?;
        header.epoch = epoch;
        header.keyring.push(EpochKey {
            epoch,
            key: SymmetricKey::generate(),
        });

        let access_key = SymmetricKey::generate();
        let header_address = Address::random();
        self.store_header(&header_address, &access_key, &header).await?;

        let payload = SharePayload {
            owner: self.username.clone(),
            header: header_address,
            access_key: access_key.clone(),
        };
        for grant in header.graph.grants() {
            let keys = self.directory.lookup(&grant.grantee).await?.ok_or_else(|| {
                SealboxError::integrity(format!("collaborator {} left the directory", grant.grantee))
            })?;
            let record = self.sign_record(SharePurpose::Rekey, &grant.grantee, filename, &keys, &payload)?;
            self.put_record(&rekey_address(&self.username, &grant.grantee, filename), &record)
                .await?;
        }

        // Commit point: from here the owner reads the new header.
        self.store_entry(
            filename,
            &FileEntry::Owned {
                header: header_address,
                access_key,
            },
        )
        .await?;

        self.cleanup_revoked(filename, &removed, &old_address).await;

        tracing::info!(
            user = %self.username,
            file = %filename,
            revoked = %old_recipient,
            removed = removed.len(),
            epoch,
            "access revoked"
        );
        Ok(())
    }

    /// Current grants on a file this user owns.
    pub async fn collaborators(&self, filename: &str) -> SealboxResult<Vec<Grant>> {
        let open = self.resolve(filename).await?;
        if open.role != Role::Owner {
            return Err(SealboxError::PermissionDenied(format!(
                "only the owner can list collaborators of {filename}"
            )));
        }
        Ok(open.header.graph.grants())
    }

    async fn cleanup_revoked(&self, filename: &str, removed: &[Grant], old_header: &Address) {
        let mut stale: Vec<Address> = removed
            .iter()
            .flat_map(|g| {
                [
                    grant_address(&g.granter, &g.grantee, filename),
                    rekey_address(&self.username, &g.grantee, filename),
                ]
            })
            .collect();
        stale.push(*old_header);

        for address in stale {
            if let Err(e) = self.blobs.delete(&address).await {
                tracing::warn!(file = %filename, address = %address, error = %e, "revocation cleanup failed");
            }
        }
    }

    fn sign_record(
        &self,
        purpose: SharePurpose,
        recipient: &str,
        filename: &str,
        recipient_keys: &PublicKeys,
        payload: &SharePayload,
    ) -> SealboxResult<ShareRecord> {
        let plaintext = zeroize::Zeroizing::new(
            serde_json::to_vec(payload).map_err(|e| anyhow::anyhow!("encoding share payload: {e}"))?,
        );
        let mut record = ShareRecord {
            purpose,
            granter: self.username.clone(),
            recipient: recipient.to_string(),
            filename: filename.to_string(),
            signer: self.username.clone(),
            ciphertext: sealed::seal_to(&recipient_keys.encryption, &plaintext)?,
            signature: Vec::new(),
        };
        record.signature = self.keys.sign(&record.signed_bytes()).to_vec();
        Ok(record)
    }

    async fn put_record(&self, address: &Address, record: &ShareRecord) -> SealboxResult<()> {
        let json = serde_json::to_vec(record).map_err(|e| anyhow::anyhow!("encoding share record: {e}"))?;
        self.blobs.put(address, json).await
    }
}
