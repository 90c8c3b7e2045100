//! Password Hashing and Verification
//!
//! Argon2id password handling with:
//! - Unicode NFKC normalization before any processing
//! - Zeroization of clear text on drop
//! - Optional application-wide pepper
//! - PHC string storage format
//!
//! Composition rules (length, character classes) belong to the caller; this
//! module only guarantees that what it hashes is normalized and that what it
//! verifies is a well-formed Argon2 hash.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ============================================================================
// Error Types
// ============================================================================

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Invalid hash format
    #[error("Invalid password hash format")]
    InvalidHashFormat,

    /// Argon2 parameters out of range
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),
}

// ============================================================================
// Hasher configuration
// ============================================================================

/// Argon2id cost parameters and pepper
///
/// `Default` uses the OWASP recommendation (m=19456 KiB, t=2, p=1).
#[derive(Clone)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pepper: Option<Zeroizing<Vec<u8>>>,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
            pepper: None,
        }
    }
}

impl Argon2Config {
    /// Minimal cost parameters. Only for tests.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST.max(64),
            iterations: 1,
            parallelism: 1,
            pepper: None,
        }
    }

    pub fn with_pepper(mut self, pepper: impl Into<Vec<u8>>) -> Self {
        let pepper = pepper.into();
        self.pepper = (!pepper.is_empty()).then(|| Zeroizing::new(pepper));
        self
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordHashError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn peppered(&self, password: &ClearTextPassword) -> Zeroizing<Vec<u8>> {
        let mut bytes = password.as_bytes().to_vec();
        if let Some(pepper) = &self.pepper {
            bytes.extend_from_slice(pepper);
        }
        Zeroizing::new(bytes)
    }
}

impl fmt::Debug for Argon2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon2Config")
            .field("memory_kib", &self.memory_kib)
            .field("iterations", &self.iterations)
            .field("parallelism", &self.parallelism)
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
///
/// ## Examples
/// ```rust
/// use platform::password::{Argon2Config, ClearTextPassword};
///
/// let password = ClearTextPassword::new("Correct-Horse-9");
/// let config = Argon2Config::insecure_fast();
/// let hashed = password.hash(&config).unwrap();
/// assert!(hashed.verify(&password, &config));
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Wrap a raw password, normalizing it with NFKC.
    pub fn new(raw: impl Into<String>) -> Self {
        let mut raw = raw.into();
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    /// Number of Unicode code points after normalization
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    /// Iterate the normalized characters
    pub fn chars(&self) -> std::str::Chars<'_> {
        self.0.chars()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Hash the password using Argon2id with a random 128-bit salt
    pub fn hash(&self, config: &Argon2Config) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let input = config.peppered(self);

        let hash = config
            .argon2()?
            .hash_password(&input, &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from PHC string (e.g., from database)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    /// Get the PHC string for storage
    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a password against this hash
    ///
    /// Cost parameters are read from the PHC string; only the pepper is taken
    /// from `config`. Argon2 compares digests in constant time.
    pub fn verify(&self, password: &ClearTextPassword, config: &Argon2Config) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };
        let input = config.peppered(password);

        Argon2::default()
            .verify_password(&input, &parsed_hash)
            .is_ok()
    }

    /// True when the stored hash is not Argon2id or used weaker parameters
    /// than `config`.
    pub fn needs_rehash(&self, config: &Argon2Config) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return true;
        };
        if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        match Params::try_from(&parsed_hash) {
            Ok(params) => {
                params.m_cost() < config.memory_kib
                    || params.t_cost() < config.iterations
                    || params.p_cost() < config.parallelism
            }
            Err(_) => true,
        }
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
