//! Verify Email Use Cases

use std::sync::Arc;

use chrono::Utc;

use crate::application::audit::record_event;
use crate::application::notifier::Notifier;
use crate::application::password_reset::load_token_account;
use crate::application::token::{TokenIssuer, TokenPurpose, action_claims};
use crate::domain::entity::AuthEventKind;
use crate::domain::repository::{AccountRepository, AuthEventRepository};
use crate::domain::value_object::Email;
use crate::error::{AuthError, AuthResult};

/// Result of a verification attempt. Both variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyEmailOutcome {
    Verified,
    AlreadyVerified,
}

/// Verify email use case
pub struct VerifyEmailUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    repo: Arc<R>,
    tokens: Arc<TokenIssuer>,
}

impl<R> VerifyEmailUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    pub fn new(repo: Arc<R>, tokens: Arc<TokenIssuer>) -> Self {
        Self { repo, tokens }
    }

    pub async fn execute(&self, token: &str) -> AuthResult<VerifyEmailOutcome> {
        let verified = self.tokens.verify_action(token, TokenPurpose::VerifyEmail)?;
        let account = load_token_account(self.repo.as_ref(), &verified.claims).await?;

        if account.email_verified {
            return Ok(VerifyEmailOutcome::AlreadyVerified);
        }

        let now = Utc::now();
        let (account, changed) = self
            .repo
            .modify(&account.account_id, move |acc| acc.mark_email_verified(now))
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        if !changed {
            return Ok(VerifyEmailOutcome::AlreadyVerified);
        }

        record_event(
            self.repo.as_ref(),
            AuthEventKind::EmailVerified,
            Some(account.account_id),
            account.email.as_str(),
            None,
        )
        .await?;
        tracing::info!(account_id = %account.account_id, "E-mail verified");

        Ok(VerifyEmailOutcome::Verified)
    }
}

/// Resend verification use case (opaque like the password reset request)
pub struct ResendVerificationUseCase<R, N>
where
    R: AccountRepository + Sync,
    N: Notifier + Sync,
{
    repo: Arc<R>,
    notifier: Arc<N>,
    tokens: Arc<TokenIssuer>,
}

impl<R, N> ResendVerificationUseCase<R, N>
where
    R: AccountRepository + Sync,
    N: Notifier + Sync,
{
    pub fn new(repo: Arc<R>, notifier: Arc<N>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            notifier,
            tokens,
        }
    }

    pub async fn execute(&self, email: &str) -> AuthResult<()> {
        let email = Email::new(email)?;
        let Some(account) = self.repo.find_by_email(&email).await? else {
            return Ok(());
        };
        if account.email_verified {
            return Ok(());
        }

        let token = self
            .tokens
            .issue_action(&action_claims(&account), TokenPurpose::VerifyEmail)?;
        if let Err(e) = self
            .notifier
            .send_verification(&account.email, &token.token)
            .await
        {
            tracing::warn!(error = %e, account_id = %account.account_id, "Verification notice failed");
        }
        Ok(())
    }
}
