//! Change Password Use Case
//!
//! Authenticated password change. Issued tokens stay valid afterwards.

use std::sync::Arc;

use chrono::Utc;

use crate::application::audit::record_event;
use crate::application::config::AuthConfig;
use crate::domain::entity::{Account, AuthEventKind};
use crate::domain::repository::{AccountRepository, AuthEventRepository};
use crate::domain::value_object::{AccountId, PasswordHash, RawPassword};
use crate::error::{AuthError, AuthResult};

/// Change password input
pub struct ChangePasswordInput {
    pub account_id: AccountId,
    pub current_password: String,
    pub new_password: String,
    pub ip_address: Option<String>,
}

/// Change password use case
pub struct ChangePasswordUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> ChangePasswordUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: ChangePasswordInput) -> AuthResult<()> {
        let current = RawPassword::for_field("currentPassword", input.current_password)?;
        let new = RawPassword::for_field("newPassword", input.new_password)?;

        let account = self
            .repo
            .find_by_id(&input.account_id)
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        let current_ok = account
            .password_hash
            .as_ref()
            .is_some_and(|hash| hash.verify(&current, &self.config.argon2));
        if !current_ok {
            return Err(AuthError::InvalidCredentials {
                attempts_left: None,
            });
        }

        rotate_password(self.repo.as_ref(), &self.config, &account, &new).await?;

        record_event(
            self.repo.as_ref(),
            AuthEventKind::PasswordChanged,
            Some(account.account_id),
            account.email.as_str(),
            input.ip_address.as_deref(),
        )
        .await?;
        tracing::info!(account_id = %account.account_id, "Password changed");

        Ok(())
    }
}

/// Strength and reuse checks, then an atomic rotation into history.
///
/// `account` is the snapshot the caller authenticated against; if its
/// password changed in the meantime the rotation is refused.
pub(crate) async fn rotate_password<R>(
    repo: &R,
    config: &AuthConfig,
    account: &Account,
    new: &RawPassword,
) -> AuthResult<Account>
where
    R: AccountRepository + Sync,
{
    config.password_policy.validate_strength(new)?;
    if config.password_policy.is_reused(
        new,
        account.password_hash.as_ref(),
        &account.password_history,
        &config.argon2,
    ) {
        return Err(AuthError::PasswordReused);
    }

    let new_hash = PasswordHash::from_raw(new, &config.argon2)?;
    let expected = account.password_hash.clone();
    let now = Utc::now();

    let (updated, rotated) = repo
        .modify(&account.account_id, move |acc| {
            if acc.password_hash != expected {
                return false;
            }
            acc.rotate_password(new_hash, now);
            true
        })
        .await?
        .ok_or(AuthError::NotFound("Account"))?;

    if !rotated {
        return Err(AuthError::Conflict(
            "Password was changed by another request".to_string(),
        ));
    }
    Ok(updated)
}
