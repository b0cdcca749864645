//! sealbox-storage: typed adapters over the two untrusted services
//!
//! Both the blob store and the key directory are plain OpenDAL operators.
//! Nothing in this crate authenticates what it reads; callers verify.

pub mod blob;
pub mod directory;
pub mod health;
pub mod operator;

pub use blob::BlobStore;
pub use directory::{KeyDirectory, Registration};
pub use health::check_health;
pub use operator::build_operator;

pub(crate) fn storage_err(context: &str, e: opendal::Error) -> sealbox_core::SealboxError {
    sealbox_core::SealboxError::Storage(format!("{context}: {e}"))
}
