//! Argon2id password hashing.

use argon2::password_hash::{PasswordHasher as _, SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::PasswordConfig;
use crate::domain::error::DomainError;

/// Hashes passwords with the configured Argon2id cost.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    default_password: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] for cost parameters Argon2 rejects.
    pub fn new(config: &PasswordConfig) -> Result<Self, DomainError> {
        let params = Params::new(config.memory_kib, config.iterations, 1, None)
            .map_err(|e| DomainError::internal(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            params,
            default_password: config.default_password.clone(),
        })
    }

    /// PHC string of `plain` under a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] if hashing fails.
    pub fn hash(&self, plain: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("password hashing failed: {e}")))
    }

    /// Hash of the password given to seeded and reset accounts.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] if hashing fails.
    pub fn hash_default(&self) -> Result<String, DomainError> {
        self.hash(&self.default_password)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    fn cheap() -> PasswordConfig {
        PasswordConfig {
            memory_kib: 256,
            iterations: 1,
            ..PasswordConfig::default()
        }
    }

    #[test]
    fn hashes_verify_and_are_salted() {
        let hasher = PasswordHasher::new(&cheap()).unwrap();
        let a = hasher.hash("abc123").unwrap();
        let b = hasher.hash("abc123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        let parsed = PasswordHash::new(&a).unwrap();
        assert!(Argon2::default().verify_password(b"abc123", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"abc124", &parsed).is_err());
    }

    #[test]
    fn default_password_comes_from_config() {
        let hasher = PasswordHasher::new(&cheap()).unwrap();
        let hash = hasher.hash_default().unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"888888", &parsed).is_ok());
    }

    #[test]
    fn rejects_unusable_cost() {
        let config = PasswordConfig {
            memory_kib: 1,
            ..cheap()
        };
        assert!(matches!(
            PasswordHasher::new(&config),
            Err(DomainError::Internal(_))
        ));
    }
}
