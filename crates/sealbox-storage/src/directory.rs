//! Public-key directory: username → published keys, set once

use opendal::Operator;
use sealbox_core::{SealboxError, SealboxResult};
use sealbox_crypto::PublicKeys;

use crate::storage_err;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    AlreadyTaken,
}

#[derive(Clone)]
pub struct KeyDirectory {
    op: Operator,
}

impl KeyDirectory {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    fn path(name: &str) -> String {
        format!("directory/{}", hex::encode(name.as_bytes()))
    }

    /// Publish `keys` under `name` unless the name is already bound.
    pub async fn register(&self, name: &str, keys: &PublicKeys) -> SealboxResult<Registration> {
        let path = Self::path(name);
        match self.op.stat(&path).await {
            Ok(_) => return Ok(Registration::AlreadyTaken),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {}
            Err(e) => return Err(storage_err("checking directory entry", e)),
        }

        let json = serde_json::to_vec(keys).map_err(|e| anyhow::anyhow!("encoding keys: {e}"))?;
        self.op
            .write(&path, json)
            .await
            .map_err(|e| storage_err("writing directory entry", e))?;
        tracing::debug!(user = %name, "registered public keys");
        Ok(Registration::Registered)
    }

    /// Keys published for `name`, `None` if unregistered.
    ///
    /// An entry that does not parse is reported as tampering.
    pub async fn lookup(&self, name: &str) -> SealboxResult<Option<PublicKeys>> {
        let data = match self.op.read(&Self::path(name)).await {
            Ok(buf) => buf.to_vec(),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err("reading directory entry", e)),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| SealboxError::integrity(format!("directory entry for {name}: {e}")))
    }
}
