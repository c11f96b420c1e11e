//! Cryptogragic logics.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Cryptographic manager.
pub struct Crypto {
    pub pwd: PasswordManager,
}

impl Crypto {
    /// Create a new [`Crypto`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let pwd = PasswordManager::new(config)?;

        Ok(Self { pwd })
    }
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
///
/// Argon2 never truncates its input, so arbitrarily long passwords hash
/// without a silent cap.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2 {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash password using Argon2id with a per-call random salt.
    ///
    /// The PHC output embeds algorithm, parameters and salt, so verification
    /// needs no external state.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify password against a PHC.
    ///
    /// A malformed hash is treated as a mismatch, never as an error.
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        phc_hash: &str,
    ) -> bool {
        let Ok(parsed) = PasswordHash::new(phc_hash) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_ref(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PasswordManager {
        // Cheap parameters, hashing cost is irrelevant here.
        PasswordManager::new(Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let pwd = manager();

        let hash = pwd.hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(pwd.verify_password("secret1", &hash));
        assert!(!pwd.verify_password("secret2", &hash));
    }

    #[test]
    fn test_salts_are_random() {
        let pwd = manager();

        let first = pwd.hash_password("secret1").unwrap();
        let second = pwd.hash_password("secret1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_long_passwords_are_not_truncated() {
        let pwd = manager();

        // Beyond bcrypt's 72-byte cap: the two passwords share their first
        // 80 bytes and must still hash differently.
        let long = "a".repeat(80);
        let longer = format!("{long}b");
        let hash = pwd.hash_password(&long).unwrap();
        assert!(pwd.verify_password(&long, &hash));
        assert!(!pwd.verify_password(&longer, &hash));
    }

    #[test]
    fn test_malformed_hash_is_false() {
        let pwd = manager();

        assert!(!pwd.verify_password("secret1", "not a phc string"));
        assert!(!pwd.verify_password("secret1", ""));
    }
}
