//! Password Value Objects
//!
//! Domain wrappers around `platform::password`:
//! - [`RawPassword`]: user input, NFKC-normalized and zeroized on drop
//! - [`PasswordHash`]: Argon2id PHC string, safe to store
//! - [`PasswordHistory`]: bounded list of previously used hashes
//!
//! ## Usage
//! ```rust
//! use auth::domain::value_object::password::{PasswordHash, RawPassword};
//! use platform::password::Argon2Config;
//!
//! let argon = Argon2Config::insecure_fast();
//! let raw = RawPassword::new("Str0ng!Passw0rd").unwrap();
//! let hashed = PasswordHash::from_raw(&raw, &argon).unwrap();
//! assert!(hashed.verify(&raw, &argon));
//! ```

use std::collections::VecDeque;
use std::fmt;

use platform::crypto::to_base64url;
use platform::password::{Argon2Config, ClearTextPassword, HashedPassword};

use crate::error::{AuthError, AuthResult};

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Raw password from user input
///
/// Memory is automatically zeroized when dropped. Composition rules live in
/// `domain::service::password_policy`; this type only rejects empty input.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    pub fn new(raw: impl Into<String>) -> AuthResult<Self> {
        Self::for_field("password", raw)
    }

    /// Same as [`RawPassword::new`] with a custom field name in errors
    pub fn for_field(field: &'static str, raw: impl Into<String>) -> AuthResult<Self> {
        let clear_text = ClearTextPassword::new(raw);
        if clear_text.char_count() == 0 {
            return Err(AuthError::validation(field, "Password is required"));
        }
        Ok(Self(clear_text))
    }

    pub(crate) fn inner(&self) -> &ClearTextPassword {
        &self.0
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// Password Hash (for storage)
// ============================================================================

/// Hashed password in Argon2id PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(HashedPassword);

impl PasswordHash {
    /// Hash a raw password
    pub fn from_raw(raw: &RawPassword, argon: &Argon2Config) -> AuthResult<Self> {
        Ok(Self(raw.inner().hash(argon)?))
    }

    /// Create from PHC string (from database or configuration)
    pub fn from_phc_string(phc_string: impl Into<String>) -> AuthResult<Self> {
        HashedPassword::from_phc_string(phc_string)
            .map(Self)
            .map_err(|_| AuthError::Internal("Invalid password hash".to_string()))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Verify a raw password against this hash (constant time)
    pub fn verify(&self, raw: &RawPassword, argon: &Argon2Config) -> bool {
        self.0.verify(raw.inner(), argon)
    }

    /// Hash of a random password nobody knows
    ///
    /// Logins without a stored hash verify against it, so they cost the same
    /// Argon2 work as a real mismatch.
    pub fn unguessable(argon: &Argon2Config) -> AuthResult<Self> {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self::from_raw(&RawPassword::new(to_base64url(&secret))?, argon)
    }

    /// True if the hash is weaker than the configured cost parameters
    pub fn needs_rehash(&self, argon: &Argon2Config) -> bool {
        self.0.needs_rehash(argon)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Password History
// ============================================================================

/// Most recent previous password hashes, newest last
///
/// Never holds more than [`PasswordHistory::CAPACITY`] entries; pushing at
/// capacity evicts the oldest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordHistory(VecDeque<PasswordHash>);

impl PasswordHistory {
    pub const CAPACITY: usize = 5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored PHC strings (oldest first), keeping the newest
    /// `CAPACITY` entries.
    pub fn from_phc_strings<I, S>(hashes: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self::new();
        for hash in hashes {
            history.push(PasswordHash::from_phc_string(hash)?);
        }
        Ok(history)
    }

    pub fn push(&mut self, hash: PasswordHash) {
        while self.0.len() >= Self::CAPACITY {
            self.0.pop_front();
        }
        self.0.push_back(hash);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PasswordHash> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// PHC strings, oldest first, for storage
    pub fn to_phc_strings(&self) -> Vec<String> {
        self.0.iter().map(|h| h.as_phc_string().to_string()).collect()
    }
}
