//! Notifier
//!
//! Outbound channel for verification and password-reset links. Delivery
//! mechanics live outside this crate; flows only hand over the token.

use crate::domain::value_object::Email;
use crate::error::AuthResult;

#[trait_variant::make(Notifier: Send)]
pub trait LocalNotifier {
    async fn send_verification(&self, email: &Email, token: &str) -> AuthResult<()>;

    async fn send_password_reset(&self, email: &Email, token: &str) -> AuthResult<()>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    async fn send_verification(&self, email: &Email, _token: &str) -> AuthResult<()> {
        tracing::info!(email = %email, "Verification link issued");
        Ok(())
    }

    async fn send_password_reset(&self, email: &Email, _token: &str) -> AuthResult<()> {
        tracing::info!(email = %email, "Password reset link issued");
        Ok(())
    }
}
