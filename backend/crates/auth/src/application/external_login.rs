//! External Login Use Case
//!
//! Sign-in through an external identity provider. The provider protocol is
//! handled elsewhere; this flow receives an identity whose e-mail the
//! provider has already verified.
//!
//! Resolution order: linked identity, then e-mail (and link), then a new
//! account without password.

use std::sync::Arc;

use chrono::Utc;

use crate::application::audit::record_event;
use crate::application::config::AuthConfig;
use crate::application::login::LoginOutput;
use crate::application::session::resolve_claims;
use crate::application::token::TokenIssuer;
use crate::domain::entity::{Account, AuthEventKind};
use crate::domain::repository::{AccountRepository, AuthEventRepository, RoleRepository};
use crate::domain::service::LockoutGuard;
use crate::domain::value_object::{Email, ExternalIdentity, RoleName};
use crate::error::{AuthError, AuthResult};

/// External login input
pub struct ExternalLoginInput {
    pub provider: String,
    pub subject: String,
    /// Verified by the provider
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub remember_me: bool,
    pub ip_address: Option<String>,
}

/// External login use case
pub struct ExternalLoginUseCase<R>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    tokens: Arc<TokenIssuer>,
}

impl<R> ExternalLoginUseCase<R>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            config,
            tokens,
        }
    }

    pub async fn execute(&self, input: ExternalLoginInput) -> AuthResult<LoginOutput> {
        let identity = ExternalIdentity::new(&input.provider, &input.subject)?;
        let email = Email::new(&input.email)?;
        let ip = input.ip_address.as_deref();

        let account = match self.repo.find_by_external_identity(&identity).await? {
            Some(account) => account,
            None => match self.repo.find_by_email(&email).await? {
                Some(account) => self.link(account, identity).await?,
                None => self.create(email, identity, &input, ip).await?,
            },
        };

        let now = Utc::now();
        let guard = LockoutGuard::new(self.config.lockout);
        let mut lockout = account.lockout;
        guard.check_access(&mut lockout, now)?;
        if !account.can_login() {
            return Err(AuthError::AccountNotActive);
        }

        let (account, access) = self
            .repo
            .modify(&account.account_id, move |acc| -> AuthResult<()> {
                guard.check_access(&mut acc.lockout, now)?;
                guard.record_success(&mut acc.lockout);
                acc.record_login(now);
                Ok(())
            })
            .await?
            .ok_or(AuthError::NotFound("Account"))?;
        access?;

        let claims = resolve_claims(self.repo.as_ref(), &account).await?;
        let token = self.tokens.issue_access(&claims, input.remember_me)?;

        record_event(
            self.repo.as_ref(),
            AuthEventKind::ExternalLogin,
            Some(account.account_id),
            account.email.as_str(),
            ip,
        )
        .await?;
        tracing::info!(
            account_id = %account.account_id,
            provider = %input.provider,
            "Account signed in through external provider"
        );

        Ok(LoginOutput {
            token,
            claims,
            account: Some(account),
        })
    }

    /// Link the identity to an existing local account
    async fn link(&self, account: Account, identity: ExternalIdentity) -> AuthResult<Account> {
        if account
            .external_identity
            .as_ref()
            .is_some_and(|linked| linked.provider() == identity.provider())
        {
            return Err(AuthError::Conflict(
                "Account is linked to another identity of this provider".to_string(),
            ));
        }

        let now = Utc::now();
        let (account, _) = self
            .repo
            .modify(&account.account_id, move |acc| {
                acc.link_external_identity(identity, now);
                // The provider vouches for the address
                acc.mark_email_verified(now)
            })
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        tracing::info!(account_id = %account.account_id, "External identity linked");
        Ok(account)
    }

    async fn create(
        &self,
        email: Email,
        identity: ExternalIdentity,
        input: &ExternalLoginInput,
        ip: Option<&str>,
    ) -> AuthResult<Account> {
        let first_name = Account::validate_person_name("firstName", &input.first_name)?;
        let last_name = Account::validate_person_name("lastName", &input.last_name)?;

        let default_role = RoleRepository::find_by_name(self.repo.as_ref(), &RoleName::user())
            .await?
            .ok_or_else(|| AuthError::Internal("Default role `user` is missing".to_string()))?;

        let mut account = Account::new_external(email, first_name, last_name, identity, Utc::now());
        account.assign_role(&default_role);
        AccountRepository::create(self.repo.as_ref(), &account).await?;

        record_event(
            self.repo.as_ref(),
            AuthEventKind::Registered,
            Some(account.account_id),
            account.email.as_str(),
            ip,
        )
        .await?;
        tracing::info!(account_id = %account.account_id, "Account created from external identity");

        Ok(account)
    }
}
