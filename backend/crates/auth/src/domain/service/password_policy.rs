//! Password Policy
//!
//! Pure strength and reuse checks. Every rule is evaluated so callers can
//! present the full list of problems at once.

use platform::password::Argon2Config;
use serde::Serialize;
use std::fmt;

use crate::domain::value_object::password::{PasswordHash, PasswordHistory, RawPassword};
use crate::error::{AuthError, AuthResult};

/// A single strength rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRule {
    Length,
    Uppercase,
    Lowercase,
    Digit,
    Special,
    MaxLength,
    ControlCharacter,
}

impl PasswordRule {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Digit => "digit",
            Self::Special => "special",
            Self::MaxLength => "max_length",
            Self::ControlCharacter => "control_character",
        }
    }

    pub const fn message(&self) -> &'static str {
        match self {
            Self::Length => "Password is too short",
            Self::Uppercase => "Password must contain an uppercase letter",
            Self::Lowercase => "Password must contain a lowercase letter",
            Self::Digit => "Password must contain a digit",
            Self::Special => "Password must contain a special character",
            Self::MaxLength => "Password is too long",
            Self::ControlCharacter => "Password must not contain control characters",
        }
    }
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Strength thresholds (code points after NFKC normalization)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 12,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    /// All violated rules, in a stable order
    pub fn violations(&self, candidate: &RawPassword) -> Vec<PasswordRule> {
        let clear = candidate.inner();
        let len = clear.char_count();

        let (mut upper, mut lower, mut digit, mut special, mut control) =
            (false, false, false, false, false);
        for c in clear.chars() {
            if c.is_control() {
                control = true;
            } else if c.is_uppercase() {
                upper = true;
            } else if c.is_lowercase() {
                lower = true;
            } else if c.is_numeric() {
                digit = true;
            } else if !c.is_alphanumeric() && !c.is_whitespace() {
                special = true;
            }
        }

        let checks = [
            (len < self.min_length, PasswordRule::Length),
            (!upper, PasswordRule::Uppercase),
            (!lower, PasswordRule::Lowercase),
            (!digit, PasswordRule::Digit),
            (!special, PasswordRule::Special),
            (len > self.max_length, PasswordRule::MaxLength),
            (control, PasswordRule::ControlCharacter),
        ];

        checks
            .into_iter()
            .filter_map(|(violated, rule)| violated.then_some(rule))
            .collect()
    }

    pub fn validate_strength(&self, candidate: &RawPassword) -> AuthResult<()> {
        let violations = self.violations(candidate);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AuthError::WeakPassword(violations))
        }
    }

    /// True if `candidate` verifies against the current hash or any history
    /// entry. Stops at the first match.
    pub fn is_reused(
        &self,
        candidate: &RawPassword,
        current: Option<&PasswordHash>,
        history: &PasswordHistory,
        argon: &Argon2Config,
    ) -> bool {
        current
            .into_iter()
            .chain(history.iter())
            .any(|hash| hash.verify(candidate, argon))
    }
}
