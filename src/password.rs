//! Salted password hashing.
//!
//! Hashes are derived with Argon2id at fixed cost parameters and stored as
//! base64 next to the salt that produced them, so `verify` can recompute and
//! compare.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

use crate::errors::AppError;

/// Fixed number of passes over memory.
pub const ITERATIONS: u32 = 3;
/// Memory cost in KiB.
pub const MEMORY_KIB: u32 = 19_456;
/// Length of the derived key in bytes.
pub const KEY_LEN: usize = 32;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Derive the stored hash for `password` under `salt`.
    pub fn encrypt(&self, password: &str, salt: &str) -> Result<String, AppError> {
        let params = Params::new(MEMORY_KIB, ITERATIONS, 1, Some(KEY_LEN))
            .map_err(|err| AppError::internal(format!("invalid hashing parameters: {err}")))?;
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; KEY_LEN];
        argon
            .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key)
            .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))?;

        Ok(STANDARD.encode(key))
    }

    /// Recompute the hash from `password` and `salt` and compare it with `stored_hash`.
    pub fn verify(&self, stored_hash: &str, password: &str, salt: &str) -> Result<bool, AppError> {
        let encrypted = self.encrypt(password, salt)?;
        Ok(stored_hash == encrypted)
    }
}

/// Fresh per-user salt.
pub fn generate_salt() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_the_matching_password() {
        let hasher = PasswordHasher::new();
        let salt = generate_salt();
        let hash = hasher.encrypt("secret123", &salt).unwrap();

        assert!(hasher.verify(&hash, "secret123", &salt).unwrap());
    }

    #[test]
    fn encrypt_is_deterministic_for_a_salt() {
        let hasher = PasswordHasher::new();
        let first = hasher.encrypt("adminadmin", "73e844e3-d3c7-4442").unwrap();
        let second = hasher.encrypt("adminadmin", "73e844e3-d3c7-4442").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn verify_rejects_wrong_password_salt_or_tampered_hash() {
        let hasher = PasswordHasher::new();
        let salt = generate_salt();
        let hash = hasher.encrypt("secret123", &salt).unwrap();

        assert!(!hasher.verify(&hash, "secret124", &salt).unwrap());
        assert!(!hasher.verify(&hash, "secret123", &generate_salt()).unwrap());

        let mut tampered = hash.clone().into_bytes();
        tampered[0] = if tampered[0] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(!hasher.verify(&tampered, "secret123", &salt).unwrap());
    }

    #[test]
    fn short_salts_are_reported_not_panicked() {
        let hasher = PasswordHasher::new();
        assert!(hasher.encrypt("secret123", "abc").is_err());
    }
}
