//! Password hashing using Argon2id.
//!
//! Hashing is CPU-bound for tens of milliseconds at production cost. Async
//! callers go through [`hash_password`] and [`verify_password`], which run the
//! work on tokio's blocking pool.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("password hashing task failed: {0}")]
    Task(String),
}

/// Hashes and compares passwords.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, PasswordError>;

    /// `false` on mismatch and on a malformed stored hash.
    fn verify(&self, hash: &str, plain: &str) -> bool;
}

/// Argon2id hasher producing PHC-format strings.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost: memory in KiB, iterations, parallelism.
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    fn verify(&self, hash: &str, plain: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("stored password hash is not in PHC format");
            return false;
        };
        // Parameters are read from the PHC string, so hashes made with a
        // different cost still verify.
        self.argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

/// [`PasswordHasher::hash`] off the async worker threads.
pub async fn hash_password(
    hasher: &Arc<dyn PasswordHasher>,
    plain: &str,
) -> Result<String, PasswordError> {
    let hasher = Arc::clone(hasher);
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hasher.hash(&plain))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
}

/// [`PasswordHasher::verify`] off the async worker threads.
pub async fn verify_password(
    hasher: &Arc<dyn PasswordHasher>,
    hash: &str,
    plain: &str,
) -> Result<bool, PasswordError> {
    let hasher = Arc::clone(hasher);
    let hash = hash.to_owned();
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hasher.verify(&hash, &plain))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))
}
