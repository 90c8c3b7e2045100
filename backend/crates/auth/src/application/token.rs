//! Token Issuer
//!
//! Stateless signed bearer tokens:
//!
//! ```text
//! base64url(JSON payload) "." base64url(HMAC-SHA256(secret, payload segment))
//! ```
//!
//! The payload carries the [`Claims`] plus `purpose`, `iat`, `exp`, `jti`.
//! The signature is checked before the payload is even decoded.

use chrono::{DateTime, Duration, TimeZone, Utc};
use platform::crypto::{SigningKey, from_base64url, to_base64url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::Account;
use crate::domain::value_object::Claims;
use crate::error::{AuthError, AuthResult};

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    VerifyEmail,
    PasswordReset,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(flatten)]
    claims: Claims,
    purpose: TokenPurpose,
    iat: i64,
    exp: i64,
    jti: String,
    #[serde(default, rename = "rememberMe")]
    remember_me: bool,
}

/// Freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Contents of a token that passed verification
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub claims: Claims,
    pub purpose: TokenPurpose,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: SigningKey,
    access_ttl: Duration,
    remember_me_ttl: Duration,
    action_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        Ok(Self {
            key: SigningKey::new(&config.token_secret)?,
            access_ttl: config.access_token_ttl,
            remember_me_ttl: config.remember_me_ttl,
            action_ttl: config.action_token_ttl,
        })
    }

    pub fn issue(
        &self,
        claims: &Claims,
        purpose: TokenPurpose,
        ttl: Duration,
        remember_me: bool,
    ) -> AuthResult<IssuedToken> {
        self.issue_at(claims, purpose, ttl, remember_me, Utc::now())
    }

    /// Access token, 24 h or 7 d with "Remember Me"
    pub fn issue_access(&self, claims: &Claims, remember_me: bool) -> AuthResult<IssuedToken> {
        let ttl = if remember_me {
            self.remember_me_ttl
        } else {
            self.access_ttl
        };
        self.issue(claims, TokenPurpose::Access, ttl, remember_me)
    }

    /// Single-purpose token (e-mail verification, password reset)
    pub fn issue_action(&self, claims: &Claims, purpose: TokenPurpose) -> AuthResult<IssuedToken> {
        self.issue(claims, purpose, self.action_ttl, false)
    }

    pub fn verify(&self, token: &str) -> AuthResult<VerifiedToken> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_access(&self, token: &str) -> AuthResult<VerifiedToken> {
        self.verify_purpose(token, TokenPurpose::Access)
    }

    pub fn verify_action(&self, token: &str, purpose: TokenPurpose) -> AuthResult<VerifiedToken> {
        self.verify_purpose(token, purpose)
    }

    fn verify_purpose(&self, token: &str, purpose: TokenPurpose) -> AuthResult<VerifiedToken> {
        let verified = self.verify(token)?;
        if verified.purpose != purpose {
            tracing::debug!(
                expected = ?purpose,
                actual = ?verified.purpose,
                "Token used for the wrong purpose"
            );
            return Err(AuthError::TokenInvalid);
        }
        Ok(verified)
    }

    fn issue_at(
        &self,
        claims: &Claims,
        purpose: TokenPurpose,
        ttl: Duration,
        remember_me: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let expires_at = now + ttl;
        let payload = TokenPayload {
            claims: claims.clone(),
            purpose,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            remember_me,
        };

        let json = serde_json::to_vec(&payload)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))?;
        let body = to_base64url(&json);
        let signature = self.key.sign(body.as_bytes());

        Ok(IssuedToken {
            token: format!("{}.{}", body, to_base64url(&signature)),
            expires_at,
        })
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<VerifiedToken> {
        let (body, signature) = token.trim().split_once('.').ok_or(AuthError::TokenInvalid)?;
        if body.is_empty() || signature.contains('.') {
            return Err(AuthError::TokenInvalid);
        }

        let signature = from_base64url(signature).map_err(|_| AuthError::TokenInvalid)?;
        if !self.key.verify(body.as_bytes(), &signature) {
            return Err(AuthError::TokenInvalid);
        }

        let json = from_base64url(body).map_err(|_| AuthError::TokenInvalid)?;
        let payload: TokenPayload =
            serde_json::from_slice(&json).map_err(|_| AuthError::TokenInvalid)?;

        let issued_at = timestamp(payload.iat)?;
        let expires_at = timestamp(payload.exp)?;
        if now >= expires_at {
            return Err(AuthError::TokenExpired);
        }

        Ok(VerifiedToken {
            claims: payload.claims,
            purpose: payload.purpose,
            issued_at,
            expires_at,
            remember_me: payload.remember_me,
        })
    }
}

/// Claims of a single-purpose token: account id and e-mail only, no roles
pub fn action_claims(account: &Account) -> Claims {
    Claims {
        subject: account.account_id.to_string(),
        email: account.email.as_str().to_string(),
        roles: Default::default(),
        permissions: Default::default(),
        is_admin: false,
        is_super_admin: false,
    }
}

fn timestamp(secs: i64) -> AuthResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(AuthError::TokenInvalid)
}
