//! Register Use Case
//!
//! Creates a local account (active, unverified, role `user`) and issues an
//! e-mail verification token. No login token is issued here.

use std::sync::Arc;

use chrono::Utc;

use crate::application::audit::record_event;
use crate::application::config::AuthConfig;
use crate::application::notifier::Notifier;
use crate::application::token::{IssuedToken, TokenIssuer, TokenPurpose, action_claims};
use crate::domain::entity::{Account, AuthEventKind};
use crate::domain::repository::{AccountRepository, AuthEventRepository, RoleRepository};
use crate::domain::value_object::{Email, PasswordHash, RawPassword, RoleName};
use crate::error::{AuthError, AuthResult};

/// Register input
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub ip_address: Option<String>,
}

/// Register output
#[derive(Debug)]
pub struct RegisterOutput {
    pub account: Account,
    /// Also handed to the notifier
    pub verification_token: IssuedToken,
}

/// Register use case
pub struct RegisterUseCase<R, N>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
    N: Notifier + Sync,
{
    repo: Arc<R>,
    notifier: Arc<N>,
    config: Arc<AuthConfig>,
    tokens: Arc<TokenIssuer>,
}

impl<R, N> RegisterUseCase<R, N>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
    N: Notifier + Sync,
{
    pub fn new(
        repo: Arc<R>,
        notifier: Arc<N>,
        config: Arc<AuthConfig>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            repo,
            notifier,
            config,
            tokens,
        }
    }

    pub async fn execute(&self, input: RegisterInput) -> AuthResult<RegisterOutput> {
        let email = Email::new(&input.email)?;
        let first_name = Account::validate_person_name("firstName", &input.first_name)?;
        let last_name = Account::validate_person_name("lastName", &input.last_name)?;

        if AccountRepository::exists_by_email(self.repo.as_ref(), &email).await? {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password = RawPassword::new(input.password)?;
        self.config.password_policy.validate_strength(&password)?;
        let password_hash = PasswordHash::from_raw(&password, &self.config.argon2)?;

        let default_role = RoleRepository::find_by_name(self.repo.as_ref(), &RoleName::user())
            .await?
            .ok_or_else(|| AuthError::Internal("Default role `user` is missing".to_string()))?;

        let mut account =
            Account::new_local(email, first_name, last_name, password_hash, Utc::now());
        account.assign_role(&default_role);

        // A concurrent registration surfaces here as EmailAlreadyRegistered
        AccountRepository::create(self.repo.as_ref(), &account).await?;

        record_event(
            self.repo.as_ref(),
            AuthEventKind::Registered,
            Some(account.account_id),
            account.email.as_str(),
            input.ip_address.as_deref(),
        )
        .await?;

        let verification_token = self
            .tokens
            .issue_action(&action_claims(&account), TokenPurpose::VerifyEmail)?;
        if let Err(e) = self
            .notifier
            .send_verification(&account.email, &verification_token.token)
            .await
        {
            tracing::warn!(error = %e, account_id = %account.account_id, "Verification notice failed");
        }

        tracing::info!(
            account_id = %account.account_id,
            email = %account.email,
            "Account registered"
        );

        Ok(RegisterOutput {
            account,
            verification_token,
        })
    }
}
