//! Password hashing capability.
//!
//! The rest of the BBS only ever asks for `hash` and `matches`; which algorithm
//! sits behind them is a deployment detail.

use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::config::Argon2Config;
use super::StorageError;

pub trait CredentialHasher: Send + Sync {
    /// One-way hash of `plaintext`, self-describing (salt and parameters included)
    fn hash(&self, plaintext: &str) -> Result<String, StorageError>;

    /// Whether `plaintext` produces `stored`. Malformed hashes never match.
    fn matches(&self, stored: &str, plaintext: &str) -> bool;
}

/// Argon2id hasher
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Argon2Hasher { argon2: Argon2::default() }
    }

    /// Build with explicit Argon2 params; unset fields keep the library defaults
    pub fn from_config(cfg: Option<&Argon2Config>) -> Result<Self, StorageError> {
        let Some(cfg) = cfg else { return Ok(Self::new()) };
        let params = Params::new(
            cfg.memory_kib.unwrap_or(Params::DEFAULT_M_COST),
            cfg.time_cost.unwrap_or(Params::DEFAULT_T_COST),
            cfg.parallelism.unwrap_or(Params::DEFAULT_P_COST),
            None,
        )
        .map_err(|e| StorageError::Hash(format!("invalid argon2 params: {e}")))?;
        Ok(Argon2Hasher { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self { Self::new() }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, StorageError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self.argon2.hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| StorageError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn matches(&self, stored: &str, plaintext: &str) -> bool {
        match PasswordHash::new(stored) {
            // params are read from the stored hash itself
            Ok(parsed) => Argon2::default().verify_password(plaintext.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                log::warn!("Corrupt password hash: {e}");
                false
            }
        }
    }
}
