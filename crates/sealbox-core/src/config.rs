use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SealboxError, SealboxResult};

/// Top-level client configuration (loaded from sealbox.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SealboxConfig {
    /// Backend holding the untrusted blob store
    pub storage: StorageConfig,
    /// Backend holding the public-key directory
    pub directory: StorageConfig,
    pub crypto: CryptoConfig,
}

impl Default for SealboxConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            directory: StorageConfig {
                bucket: "sealbox-directory".into(),
                ..StorageConfig::default()
            },
            crypto: CryptoConfig::default(),
        }
    }
}

impl SealboxConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> SealboxResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| SealboxError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> SealboxResult<Self> {
        toml::from_str(text).map_err(|e| SealboxError::Config(e.to_string()))
    }
}

/// Where an untrusted key-value service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// "memory", "fs" or "s3"
    pub backend: String,
    /// Root directory (fs) or key prefix (s3)
    pub root: PathBuf,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// S3 bucket name
    pub bucket: String,
    /// Refuse plaintext HTTP S3 endpoints
    pub enforce_tls: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".into(),
            root: PathBuf::from("/"),
            endpoint: "http://localhost:8333".into(),
            region: "us-east-1".into(),
            bucket: "sealbox".into(),
            enforce_tls: false,
        }
    }
}

/// Password KDF cost for newly created accounts.
///
/// Existing accounts always re-derive with the cost recorded at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}
