//! Salted, memory-hard password hashing.
//!
//! Passwords are low-entropy and user-chosen, so they get a per-user random salt and
//! Argon2id. Stored values are hex strings: a 16-byte salt and a 32-byte digest.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::auth::tokens::constant_time_eq;
use crate::error::{AppError, AppResult};

pub const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// A random per-password salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn from_hex(value: &str) -> Option<Self> {
        let bytes = hex::decode(value).ok()?;
        let bytes: [u8; SALT_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Produces a fresh salt from the operating system CSPRNG.
pub fn generate_salt() -> Salt {
    let mut bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut bytes);
    Salt(bytes)
}

#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> AppResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, Some(HASH_LEN))
            .map_err(|e| AppError::Internal(format!("Invalid Argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn digest(&self, password: &str, salt: &Salt) -> Result<[u8; HASH_LEN], argon2::Error> {
        let mut out = [0u8; HASH_LEN];
        self.argon2()
            .hash_password_into(password.as_bytes(), &salt.0, &mut out)?;
        Ok(out)
    }

    /// Hex-encoded Argon2id digest of `password` under `salt`.
    pub fn hash_password(&self, password: &str, salt: &Salt) -> AppResult<String> {
        self.digest(password, salt)
            .map(hex::encode)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
    }

    /// Recomputes the digest and compares in constant time. Corrupt stored values are
    /// a mismatch, not an error.
    pub fn verify_password_valid(&self, candidate: &str, salt: &str, stored_hash: &str) -> bool {
        let Some(salt) = Salt::from_hex(salt) else {
            return false;
        };
        let Ok(stored) = hex::decode(stored_hash) else {
            return false;
        };
        match self.digest(candidate, &salt) {
            Ok(computed) => constant_time_eq(&computed, &stored),
            Err(_) => false,
        }
    }

    /// Fresh salt and digest for storing a new password.
    pub fn new_credentials(&self, password: &str) -> AppResult<(String, String)> {
        let salt = generate_salt();
        let hash = self.hash_password(password, &salt)?;
        Ok((hash, salt.to_hex()))
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}
