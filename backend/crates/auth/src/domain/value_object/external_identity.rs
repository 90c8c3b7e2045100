//! External Identity Value Object
//!
//! (provider, subject) pair identifying a federated account, e.g.
//! `("google", "1098...")`. Provider protocol details stay outside this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, AuthResult};

const PROVIDER_MAX_LENGTH: usize = 32;
const SUBJECT_MAX_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalIdentity {
    provider: String,
    subject: String,
}

impl ExternalIdentity {
    pub fn new(provider: impl AsRef<str>, subject: impl AsRef<str>) -> AuthResult<Self> {
        let provider = provider.as_ref().trim().to_lowercase();
        let subject = subject.as_ref().trim().to_string();

        if provider.is_empty()
            || provider.len() > PROVIDER_MAX_LENGTH
            || !provider
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AuthError::validation("provider", "Invalid identity provider"));
        }
        if subject.is_empty() || subject.len() > SUBJECT_MAX_LENGTH {
            return Err(AuthError::validation("subject", "Invalid provider subject"));
        }

        Ok(Self { provider, subject })
    }

    pub fn from_db(provider: String, subject: String) -> Self {
        Self { provider, subject }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Display for ExternalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.subject)
    }
}
