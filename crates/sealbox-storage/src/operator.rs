//! OpenDAL Operator factory for sealbox backends

use anyhow::{Context, Result};
use opendal::Operator;
use sealbox_core::config::StorageConfig;

/// Build an operator for the configured backend.
///
/// S3 credentials are picked up from the usual `AWS_*` environment variables
/// by OpenDAL itself. No retry layer is installed: a failed store call
/// surfaces to the caller as-is.
pub fn build_operator(cfg: &StorageConfig) -> Result<Operator> {
    let root = cfg.root.to_string_lossy();
    let op = match cfg.backend.as_str() {
        "memory" => Operator::new(opendal::services::Memory::default().root(&root))
            .context("creating OpenDAL memory operator")?
            .layer(opendal::layers::LoggingLayer::default())
            .finish(),
        "fs" => Operator::new(opendal::services::Fs::default().root(&root))
            .context("creating OpenDAL fs operator")?
            .layer(opendal::layers::LoggingLayer::default())
            .finish(),
        "s3" => {
            check_endpoint(cfg)?;
            // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
            let builder = opendal::services::S3::default()
                .root(&root)
                .endpoint(&cfg.endpoint)
                .region(&cfg.region)
                .bucket(&cfg.bucket);
            Operator::new(builder)
                .context("creating OpenDAL S3 operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }
        other => anyhow::bail!("unknown storage backend: {other:?} (expected memory, fs or s3)"),
    };

    tracing::debug!(backend = %cfg.backend, root = %root, "storage operator ready");
    Ok(op)
}

/// Refuse or warn on plaintext S3 endpoints.
fn check_endpoint(cfg: &StorageConfig) -> Result<()> {
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set enforce_tls = false for local development.",
                cfg.endpoint
            );
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted"
        );
    }
    Ok(())
}
