//! Key derivation: Argon2id password → master key

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use sealbox_core::config::CryptoConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{KEY_SIZE, SALT_SIZE};

/// Upper bounds accepted from a stored record. A tampered UserRecord must not
/// be able to make a login allocate more than 256 MiB or spin for seconds.
const MAX_MEM_COST_KIB: u32 = 1 << 18;
const MAX_TIME_COST: u32 = 8;
const MAX_PARALLELISM: u32 = 8;

/// A 256-bit master key derived from a password via Argon2id.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters, persisted in each UserRecord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from(&CryptoConfig::default())
    }
}

impl From<&CryptoConfig> for KdfParams {
    fn from(config: &CryptoConfig) -> Self {
        Self {
            mem_cost_kib: config.argon2_mem_cost_kib,
            time_cost: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }
}

impl KdfParams {
    /// Reject parameters Argon2 would refuse or that exceed the login budget.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            anyhow::bail!("argon2 parallelism out of range: {}", self.parallelism);
        }
        if self.time_cost == 0 || self.time_cost > MAX_TIME_COST {
            anyhow::bail!("argon2 time cost out of range: {}", self.time_cost);
        }
        if self.mem_cost_kib < 8 * self.parallelism || self.mem_cost_kib > MAX_MEM_COST_KIB {
            anyhow::bail!("argon2 memory cost out of range: {} KiB", self.mem_cost_kib);
        }
        Ok(())
    }
}

/// Fresh random per-user salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive a 256-bit master key from a password and salt using Argon2id.
///
/// The salt is stored in the clear next to the verifier; it only needs to be
/// unique per user.
pub fn derive_master_key(
    password: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> anyhow::Result<MasterKey> {
    params.validate()?;

    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| anyhow::anyhow!("invalid Argon2id params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| anyhow::anyhow!("Argon2id KDF failed: {e}"))?;

    Ok(MasterKey::from_bytes(key))
}
