//! Password Reset Use Cases
//!
//! Request: opaque, never reveals whether the e-mail is registered.
//! Reset: purpose-tagged token bound to account id and e-mail, then the same
//! strength and reuse rules as a password change.

use std::sync::Arc;

use crate::application::audit::record_event;
use crate::application::change_password::rotate_password;
use crate::application::config::AuthConfig;
use crate::application::notifier::Notifier;
use crate::application::token::{TokenIssuer, TokenPurpose, action_claims};
use crate::domain::entity::{Account, AuthEventKind};
use crate::domain::repository::{AccountRepository, AuthEventRepository};
use crate::domain::value_object::{Claims, Email, RawPassword};
use crate::error::{AuthError, AuthResult};

/// Request password reset use case
pub struct RequestPasswordResetUseCase<R, N>
where
    R: AccountRepository + AuthEventRepository + Sync,
    N: Notifier + Sync,
{
    repo: Arc<R>,
    notifier: Arc<N>,
    tokens: Arc<TokenIssuer>,
}

impl<R, N> RequestPasswordResetUseCase<R, N>
where
    R: AccountRepository + AuthEventRepository + Sync,
    N: Notifier + Sync,
{
    pub fn new(repo: Arc<R>, notifier: Arc<N>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            notifier,
            tokens,
        }
    }

    pub async fn execute(&self, email: &str, ip_address: Option<&str>) -> AuthResult<()> {
        let email = Email::new(email)?;

        let Some(account) = self.repo.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown e-mail");
            return Ok(());
        };
        if !account.can_login() {
            tracing::debug!(account_id = %account.account_id, "Password reset requested for inactive account");
            return Ok(());
        }

        let token = self
            .tokens
            .issue_action(&action_claims(&account), TokenPurpose::PasswordReset)?;
        if let Err(e) = self
            .notifier
            .send_password_reset(&account.email, &token.token)
            .await
        {
            tracing::warn!(error = %e, account_id = %account.account_id, "Password reset notice failed");
        }

        record_event(
            self.repo.as_ref(),
            AuthEventKind::PasswordResetRequested,
            Some(account.account_id),
            account.email.as_str(),
            ip_address,
        )
        .await
    }
}

/// Reset password input
pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
    pub ip_address: Option<String>,
}

/// Reset password use case
pub struct ResetPasswordUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    tokens: Arc<TokenIssuer>,
}

impl<R> ResetPasswordUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            config,
            tokens,
        }
    }

    pub async fn execute(&self, input: ResetPasswordInput) -> AuthResult<()> {
        let verified = self
            .tokens
            .verify_action(&input.token, TokenPurpose::PasswordReset)?;
        let new = RawPassword::for_field("newPassword", input.new_password)?;

        let account = load_token_account(self.repo.as_ref(), &verified.claims).await?;
        rotate_password(self.repo.as_ref(), &self.config, &account, &new).await?;

        record_event(
            self.repo.as_ref(),
            AuthEventKind::PasswordReset,
            Some(account.account_id),
            account.email.as_str(),
            input.ip_address.as_deref(),
        )
        .await?;
        tracing::info!(account_id = %account.account_id, "Password reset");

        Ok(())
    }
}

/// Account a single-purpose token was issued for.
///
/// Rejects the token if the account is gone or its e-mail no longer matches.
pub(crate) async fn load_token_account<R>(repo: &R, claims: &Claims) -> AuthResult<Account>
where
    R: AccountRepository + Sync,
{
    let account_id = claims.account_id().ok_or(AuthError::TokenInvalid)?;
    let account = repo
        .find_by_id(&account_id)
        .await?
        .ok_or(AuthError::TokenInvalid)?;
    if account.email.as_str() != claims.email {
        tracing::warn!(account_id = %account_id, "Token e-mail does not match account");
        return Err(AuthError::TokenInvalid);
    }
    Ok(account)
}
