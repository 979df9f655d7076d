use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::error::{AppError, Result};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// One-way password derivation used by the credential issuer.
pub trait CredentialHasher: Send + Sync {
    /// Hashes a plaintext password into a self-describing digest.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Checks a plaintext password against a digest produced by `hash`.
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool>;
}

/// Argon2id hasher.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Creates a hasher with the production cost parameters.
    pub fn new() -> Result<Self> {
        Self::with_cost(ARGON2_MEMORY_MB * 1024, ARGON2_ITERATIONS, ARGON2_PARALLELISM)
    }

    /// Creates a hasher with explicit cost parameters (memory in KiB).
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = ParamsBuilder::new()
            .m_cost(memory_kib)
            .t_cost(iterations)
            .p_cost(parallelism)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let mut password_bytes = plaintext.as_bytes().to_vec();

        let mut salt_bytes = [0u8; 16];
        OsRng.fill_bytes(&mut salt_bytes);

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

        let password_hash = self
            .argon2()
            .hash_password(&password_bytes, &salt)
            .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
            .to_string();

        password_bytes.zeroize();
        tracing::debug!("Password hashed successfully with Argon2");
        Ok(password_hash)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let mut password_bytes = plaintext.as_bytes().to_vec();
        let parsed_hash = PasswordHash::new(digest)
            .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;

        // Cost parameters are read from the digest itself.
        let result = Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok();

        password_bytes.zeroize();
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::with_cost(1024, 1, 1).unwrap()
}
