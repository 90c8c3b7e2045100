//! Login Use Case
//!
//! Verifies credentials under the lockout policy and issues an access token.
//!
//! Order matters: the lockout check always runs before the password is
//! verified, so a locked account never reveals whether a password was right.
//! Every attempt that reaches the password step pays one Argon2
//! verification, including unknown e-mails and accounts without a password.

use std::sync::Arc;

use chrono::Utc;

use crate::application::audit::record_event;
use crate::application::config::AuthConfig;
use crate::application::session::resolve_claims;
use crate::application::super_admin_login::SuperAdminLoginUseCase;
use crate::application::token::{IssuedToken, TokenIssuer};
use crate::domain::entity::{Account, AuthEventKind};
use crate::domain::repository::{AccountRepository, AuthEventRepository, RoleRepository};
use crate::domain::service::LockoutGuard;
use crate::domain::value_object::{Claims, Email, PasswordHash, RawPassword};
use crate::error::{AuthError, AuthResult};

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// Remember me flag
    pub remember_me: bool,
    pub ip_address: Option<String>,
}

/// Login output
#[derive(Debug)]
pub struct LoginOutput {
    pub token: IssuedToken,
    pub claims: Claims,
    /// `None` for the bootstrap super-administrator
    pub account: Option<Account>,
}

/// Login use case
pub struct LoginUseCase<R>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    tokens: Arc<TokenIssuer>,
    /// See [`PasswordHash::unguessable`]
    decoy_hash: Arc<PasswordHash>,
}

impl<R> LoginUseCase<R>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
{
    pub fn new(
        repo: Arc<R>,
        config: Arc<AuthConfig>,
        tokens: Arc<TokenIssuer>,
        decoy_hash: Arc<PasswordHash>,
    ) -> Self {
        Self {
            repo,
            config,
            tokens,
            decoy_hash,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        let email = Email::new(&input.email)?;
        let password = RawPassword::new(input.password)?;
        let ip = input.ip_address.as_deref();

        if SuperAdminLoginUseCase::<R>::matches(&self.config, &email) {
            return SuperAdminLoginUseCase::new(
                self.repo.clone(),
                self.config.clone(),
                self.tokens.clone(),
            )
            .authenticate(&email, &password, ip)
            .await;
        }

        let Some(account) = self.repo.find_by_email(&email).await? else {
            self.verify_password(None, &password);
            record_event(
                self.repo.as_ref(),
                AuthEventKind::LoginFailed,
                None,
                email.as_str(),
                ip,
            )
            .await?;
            return Err(AuthError::InvalidCredentials {
                attempts_left: None,
            });
        };

        let now = Utc::now();
        let guard = LockoutGuard::new(self.config.lockout);

        // Expired locks are cleared on a copy; the reset is persisted by the
        // success or failure update below.
        let mut lockout = account.lockout;
        if let Err(err) = guard.check_access(&mut lockout, now) {
            record_event(
                self.repo.as_ref(),
                AuthEventKind::LoginRejectedLocked,
                Some(account.account_id),
                email.as_str(),
                ip,
            )
            .await?;
            return Err(err);
        }

        if !self.verify_password(account.password_hash.as_ref(), &password) {
            return Err(self.fail(&account, ip).await?);
        }

        if !account.can_login() {
            tracing::info!(account_id = %account.account_id, status = %account.status, "Login refused for inactive account");
            return Err(AuthError::AccountNotActive);
        }

        let rehashed = match &account.password_hash {
            Some(hash) if hash.needs_rehash(&self.config.argon2) => {
                Some(PasswordHash::from_raw(&password, &self.config.argon2)?)
            }
            _ => None,
        };

        let (account, access) = self
            .repo
            .modify(&account.account_id, move |acc| -> AuthResult<()> {
                // Another attempt may have locked the account meanwhile
                guard.check_access(&mut acc.lockout, now)?;
                guard.record_success(&mut acc.lockout);
                if let Some(hash) = rehashed {
                    acc.password_hash = Some(hash);
                }
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
            AuthEventKind::LoginSucceeded,
            Some(account.account_id),
            account.email.as_str(),
            ip,
        )
        .await?;

        tracing::info!(
            account_id = %account.account_id,
            remember_me = input.remember_me,
            "Account signed in"
        );

        Ok(LoginOutput {
            token,
            claims,
            account: Some(account),
        })
    }

    /// False without a stored hash, after the same work as a mismatch
    fn verify_password(&self, stored: Option<&PasswordHash>, password: &RawPassword) -> bool {
        match stored {
            Some(hash) => hash.verify(password, &self.config.argon2),
            None => {
                let _ = self.decoy_hash.verify(password, &self.config.argon2);
                false
            }
        }
    }

    /// Counts a failed attempt atomically and builds the error to return
    async fn fail(&self, account: &Account, ip: Option<&str>) -> AuthResult<AuthError> {
        let now = Utc::now();
        let guard = LockoutGuard::new(self.config.lockout);

        let (_, outcome) = self
            .repo
            .modify(&account.account_id, move |acc| {
                guard.record_failure(&mut acc.lockout, now)
            })
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        record_event(
            self.repo.as_ref(),
            AuthEventKind::LoginFailed,
            Some(account.account_id),
            account.email.as_str(),
            ip,
        )
        .await?;

        if outcome.locked_now {
            record_event(
                self.repo.as_ref(),
                AuthEventKind::AccountLocked,
                Some(account.account_id),
                account.email.as_str(),
                ip,
            )
            .await?;
            tracing::warn!(
                account_id = %account.account_id,
                locked_until = ?outcome.locked_until,
                "Account locked after repeated failures"
            );
        }

        Ok(AuthError::InvalidCredentials {
            attempts_left: Some(outcome.attempts_left),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryAuthRepository;

    fn use_case(decoy_password: &str) -> LoginUseCase<InMemoryAuthRepository> {
        let config = AuthConfig::development();
        let tokens = TokenIssuer::new(&config).unwrap();
        let decoy =
            PasswordHash::from_raw(&RawPassword::new(decoy_password).unwrap(), &config.argon2)
                .unwrap();
        LoginUseCase::new(
            Arc::new(InMemoryAuthRepository::new()),
            Arc::new(config),
            Arc::new(tokens),
            Arc::new(decoy),
        )
    }

    #[test]
    fn test_missing_hash_never_verifies() {
        let login = use_case("Decoy!Passw0rd");
        // Even the decoy's own password is rejected
        let password = RawPassword::new("Decoy!Passw0rd").unwrap();
        assert!(!login.verify_password(None, &password));
    }

    #[test]
    fn test_stored_hash_is_checked() {
        let login = use_case("Decoy!Passw0rd");
        let password = RawPassword::new("Str0ng!Passw0rd").unwrap();
        let hash = PasswordHash::from_raw(&password, &login.config.argon2).unwrap();
        assert!(login.verify_password(Some(&hash), &password));
        assert!(!login.verify_password(Some(&hash), &RawPassword::new("Wrong!Passw0rd").unwrap()));
    }

    #[tokio::test]
    async fn test_unknown_email_is_recorded() {
        let login = use_case("Decoy!Passw0rd");
        let err = login
            .execute(LoginInput {
                email: "ghost@example.com".into(),
                password: "Decoy!Passw0rd".into(),
                remember_me: false,
                ip_address: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials { attempts_left: None }));
        assert_eq!(login.repo.event_count().await, 1);
    }
}
