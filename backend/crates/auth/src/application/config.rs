//! Application Configuration
//!
//! Configuration for the Auth application layer.

use chrono::Duration;
use platform::password::Argon2Config;

use crate::domain::service::{LockoutPolicy, PasswordPolicy};
use crate::domain::value_object::{Email, PasswordHash};

/// Credentials of the bootstrap super-administrator
///
/// Injected from the environment; the password is only ever held as a hash.
#[derive(Debug, Clone)]
pub struct SuperAdminConfig {
    pub email: Email,
    pub password_hash: PasswordHash,
}

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token signing secret for HMAC-SHA256 (32 bytes)
    pub token_secret: [u8; 32],
    /// Access token TTL without "Remember Me" (24 hours)
    pub access_token_ttl: Duration,
    /// Access token TTL with "Remember Me" (1 week)
    pub remember_me_ttl: Duration,
    /// E-mail verification / password reset token TTL (1 hour)
    pub action_token_ttl: Duration,
    /// Bootstrap super-administrator token TTL (1 hour)
    pub super_admin_token_ttl: Duration,
    pub lockout: LockoutPolicy,
    pub password_policy: PasswordPolicy,
    /// Argon2id cost parameters and optional pepper
    pub argon2: Argon2Config,
    pub super_admin: Option<SuperAdminConfig>,
    /// Default number of entries returned by login history
    pub login_history_limit: u32,
}

/// Defaults sign with a fresh random secret; a deployment that must keep
/// tokens valid across restarts sets `token_secret` explicitly.
impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: random_secret(),
            access_token_ttl: Duration::hours(24),
            remember_me_ttl: Duration::days(7),
            action_token_ttl: Duration::hours(1),
            super_admin_token_ttl: Duration::hours(1),
            lockout: LockoutPolicy::default(),
            password_policy: PasswordPolicy::default(),
            argon2: Argon2Config::default(),
            super_admin: None,
            login_history_limit: 50,
        }
    }
}

impl AuthConfig {
    /// Create config for development and tests (cheap Argon2 parameters)
    pub fn development() -> Self {
        Self {
            argon2: Argon2Config::insecure_fast(),
            ..Self::default()
        }
    }

    pub fn with_super_admin(mut self, super_admin: SuperAdminConfig) -> Self {
        self.super_admin = Some(super_admin);
        self
    }
}

fn random_secret() -> [u8; 32] {
    use rand::RngCore;
    let mut secret = [0u8; 32];
    rand::rng().fill_bytes(&mut secret);
    secret
}
