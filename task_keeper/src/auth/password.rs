//! Password hashing and verification.
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`),
//! so algorithm, parameters and salt travel with the hash. Verification reads
//! the parameters from the digest, which keeps old hashes verifiable if the
//! work factor is ever raised.

use super::errors::{AuthError, AuthResult};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
        rand_core::OsRng,
    },
};

/// Argon2 memory cost in KiB
pub const MEMORY_COST_KIB: u32 = 19_456;
/// Argon2 iterations
pub const TIME_COST: u32 = 2;
/// Argon2 lanes
pub const PARALLELISM: u32 = 1;

/// Adaptive password hasher with a fixed work factor.
///
/// Hashing is CPU bound. Request handlers must use [`hash_blocking`] and
/// [`verify_blocking`], which run on Tokio's blocking pool.
///
/// [`hash_blocking`]: PasswordHasher::hash_blocking
/// [`verify_blocking`]: PasswordHasher::verify_blocking
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            memory_kib: MEMORY_COST_KIB,
            iterations: TIME_COST,
            parallelism: PARALLELISM,
        }
    }
}

impl PasswordHasher {
    /// Hasher with explicit Argon2 parameters.
    ///
    /// Returns `HashingFailed` when the parameters are outside Argon2's limits.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> AuthResult<Self> {
        Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|_| AuthError::HashingFailed)?;
        Ok(Self {
            memory_kib,
            iterations,
            parallelism,
        })
    }

    fn argon2(&self) -> AuthResult<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|_| AuthError::HashingFailed)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a plaintext password into a self-describing digest
    ///
    /// # Errors
    ///
    /// * `AuthError::EmptyPassword` - plaintext is empty
    /// * `AuthError::HashingFailed` - Argon2 rejected the input
    pub fn hash(&self, plaintext: &str) -> AuthResult<String> {
        if plaintext.is_empty() {
            return Err(AuthError::EmptyPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        Ok(self
            .argon2()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Check a plaintext password against a digest produced by [`hash`](Self::hash)
    ///
    /// Mismatch is `Ok(false)`; only an unparsable digest is an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(digest).map_err(|_| AuthError::MalformedHash)?;

        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AuthError::MalformedHash),
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool
    pub async fn hash_blocking(&self, plaintext: String) -> AuthResult<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| {
                log::error!("Password hashing task failed: {e}");
                AuthError::HashingFailed
            })?
    }

    /// [`verify`](Self::verify) on the blocking thread pool
    pub async fn verify_blocking(&self, plaintext: String, digest: String) -> AuthResult<bool> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| {
                log::error!("Password verification task failed: {e}");
                AuthError::HashingFailed
            })?
    }
}
