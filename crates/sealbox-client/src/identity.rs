//! Account creation and password login
//!
//! Nothing secret is stored: the UserRecord holds a salt, the KDF cost and a
//! verifier. Every key a session needs is re-derived from the password.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use sealbox_core::{SealboxError, SealboxResult};
use sealbox_crypto::{derive_master_key, generate_salt, KdfParams, KeyBundle};
use sealbox_storage::Registration;

use crate::records::{user_address, FileIndex, UserRecord, RECORD_VERSION};
use crate::session::Session;
use crate::Client;

/// Keyed hash over everything in the record, so a wrong password and an
/// edited salt or cost fail the same way.
fn compute_verifier(keys: &KeyBundle, username: &str, salt: &[u8; 16], kdf: &KdfParams) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_keyed(keys.verifier().as_bytes());
    hasher.update(b"sealbox/verifier/v1");
    hasher.update(&(username.len() as u64).to_be_bytes());
    hasher.update(username.as_bytes());
    hasher.update(salt);
    hasher.update(&kdf.mem_cost_kib.to_be_bytes());
    hasher.update(&kdf.time_cost.to_be_bytes());
    hasher.update(&kdf.parallelism.to_be_bytes());
    *hasher.finalize().as_bytes()
}

fn validate_credentials(username: &str, password: &SecretString) -> SealboxResult<()> {
    if username.is_empty() {
        return Err(SealboxError::InvalidInput("username must not be empty".into()));
    }
    if password.expose_secret().is_empty() {
        return Err(SealboxError::InvalidInput("password must not be empty".into()));
    }
    Ok(())
}

impl Client {
    /// Register `username` and return a session for it.
    pub async fn create_account(
        &self,
        username: &str,
        password: &SecretString,
    ) -> SealboxResult<Session> {
        validate_credentials(username, password)?;

        let address = user_address(username);
        if self.blobs.get(&address).await?.is_some() {
            return Err(SealboxError::AccountExists);
        }

        let salt = generate_salt();
        let master = derive_master_key(password, &salt, &self.kdf)?;
        let keys = KeyBundle::derive(&master)?;

        // Claim the name in the set-once directory before writing the record.
        match self.directory.register(username, &keys.public_keys()).await? {
            Registration::Registered => {}
            Registration::AlreadyTaken => return Err(SealboxError::AccountExists),
        }

        let record = UserRecord {
            version: RECORD_VERSION,
            salt,
            kdf: self.kdf,
            verifier: compute_verifier(&keys, username, &salt, &self.kdf),
        };
        let json = serde_json::to_vec(&record).map_err(|e| anyhow::anyhow!("encoding user record: {e}"))?;
        self.blobs.put(&address, json).await?;

        let session = self.session(username, keys)?;
        session.store_index(&FileIndex::default()).await?;

        tracing::info!(user = %username, "account created");
        Ok(session)
    }

    /// Log in from scratch; no state is carried over from earlier sessions.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> SealboxResult<Session> {
        validate_credentials(username, password)?;

        let Some(raw) = self.blobs.get(&user_address(username)).await? else {
            return Err(SealboxError::UnknownAccount);
        };
        let record: UserRecord = serde_json::from_slice(&raw)
            .map_err(|e| SealboxError::integrity(format!("user record for {username}: {e}")))?;
        if record.version != RECORD_VERSION {
            return Err(SealboxError::integrity(format!(
                "user record for {username} has version {}",
                record.version
            )));
        }
        record
            .kdf
            .validate()
            .map_err(|e| SealboxError::integrity(format!("user record for {username}: {e}")))?;

        let master = derive_master_key(password, &record.salt, &record.kdf)?;
        let keys = KeyBundle::derive(&master)?;

        let expected = compute_verifier(&keys, username, &record.salt, &record.kdf);
        if !bool::from(expected.ct_eq(&record.verifier)) {
            tracing::debug!(user = %username, "password verification failed");
            return Err(SealboxError::AuthenticationFailed);
        }

        match self.directory.lookup(username).await? {
            Some(published) if published == keys.public_keys() => {}
            Some(_) => {
                return Err(SealboxError::integrity(format!(
                    "directory keys for {username} do not match the password"
                )))
            }
            None => {
                return Err(SealboxError::integrity(format!(
                    "no directory entry for existing user {username}"
                )))
            }
        }

        tracing::info!(user = %username, "authenticated");
        self.session(username, keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_crypto::MasterKey;

    fn params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_verifier_binds_record_fields() {
        let keys = KeyBundle::derive(&MasterKey::from_bytes([1u8; 32])).unwrap();
        let base = compute_verifier(&keys, "alice", &[0u8; 16], &params());

        assert_eq!(base, compute_verifier(&keys, "alice", &[0u8; 16], &params()));
        assert_ne!(base, compute_verifier(&keys, "alicf", &[0u8; 16], &params()));
        assert_ne!(base, compute_verifier(&keys, "alice", &[1u8; 16], &params()));
        let cheaper = KdfParams {
            time_cost: 2,
            ..params()
        };
        assert_ne!(base, compute_verifier(&keys, "alice", &[0u8; 16], &cheaper));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let err = validate_credentials("", &SecretString::from("pw")).unwrap_err();
        assert!(matches!(err, SealboxError::InvalidInput(_)));
        let err = validate_credentials("alice", &SecretString::from("")).unwrap_err();
        assert!(matches!(err, SealboxError::InvalidInput(_)));
    }
}
