//! Untrusted blob store: opaque bytes at 16-byte addresses

use opendal::Operator;
use sealbox_core::SealboxResult;
use sealbox_crypto::Address;

use crate::storage_err;

const PREFIX: &str = "blob/";

/// Put/Get/Delete over an OpenDAL operator, one object per address.
///
/// The `raw_*` methods expose the same store the way an adversary with full
/// write access would see it. They exist for tamper tests and tooling;
/// protocol code never needs them.
#[derive(Clone)]
pub struct BlobStore {
    op: Operator,
}

impl BlobStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    fn path(address: &Address) -> String {
        format!("{PREFIX}{}", address.to_hex())
    }

    pub async fn put(&self, address: &Address, value: Vec<u8>) -> SealboxResult<()> {
        tracing::trace!(address = %address, len = value.len(), "blob put");
        self.op
            .write(&Self::path(address), value)
            .await
            .map(|_| ())
            .map_err(|e| storage_err("writing blob", e))
    }

    /// `None` when nothing is stored at `address`.
    pub async fn get(&self, address: &Address) -> SealboxResult<Option<Vec<u8>>> {
        match self.op.read(&Self::path(address)).await {
            Ok(buf) => Ok(Some(buf.to_vec())),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err("reading blob", e)),
        }
    }

    /// Remove the blob at `address`. Deleting a missing blob succeeds.
    pub async fn delete(&self, address: &Address) -> SealboxResult<()> {
        tracing::trace!(address = %address, "blob delete");
        match self.op.delete(&Self::path(address)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("deleting blob", e)),
        }
    }

    pub async fn raw_put(&self, address: &Address, value: Vec<u8>) -> SealboxResult<()> {
        self.put(address, value).await
    }

    pub async fn raw_get(&self, address: &Address) -> SealboxResult<Option<Vec<u8>>> {
        self.get(address).await
    }

    /// Every address currently holding a blob, sorted.
    pub async fn raw_keys(&self) -> SealboxResult<Vec<Address>> {
        let entries = match self.op.list(PREFIX).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("listing blobs", e)),
        };
        let mut keys: Vec<Address> = entries
            .iter()
            .filter_map(|entry| Address::from_hex(entry.name()))
            .collect();
        keys.sort();
        Ok(keys)
    }
}
