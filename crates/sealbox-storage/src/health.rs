//! Storage health check

use anyhow::Result;
use opendal::Operator;

/// Check that a blob store or key directory answers a listing of its root.
///
/// Healthy means reachable and nothing more. The stored records are not
/// read, so a store serving tampered data still passes; integrity is only
/// established by opening records with a user's keys.
pub async fn check_health(op: &Operator) -> Result<()> {
    op.list("/")
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("storage health check failed: {e}"))
}
