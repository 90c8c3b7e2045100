//! Session Use Cases
//!
//! Tokens are stateless: authorization only verifies the signature and
//! expiry. Logging out is a client-side discard.
//!
//! A bootstrap super-administrator token is honored only while the same
//! identity is still configured; removing or rotating the credential
//! invalidates every token issued for it.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::login::LoginOutput;
use crate::application::token::{TokenIssuer, TokenPurpose};
use crate::domain::entity::Account;
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::domain::service::role_resolver;
use crate::domain::value_object::Claims;
use crate::error::{AuthError, AuthResult};

/// Authorize: access token to claims
pub fn authorize(config: &AuthConfig, tokens: &TokenIssuer, token: &str) -> AuthResult<Claims> {
    let claims = tokens.verify_access(token)?.claims;
    ensure_bootstrap_configured(config, &claims)?;
    Ok(claims)
}

fn ensure_bootstrap_configured(config: &AuthConfig, claims: &Claims) -> AuthResult<()> {
    if !claims.is_bootstrap() {
        return Ok(());
    }
    let configured = config
        .super_admin
        .as_ref()
        .is_some_and(|sa| sa.email.as_str() == claims.email);
    if !configured {
        tracing::warn!("Rejected token of a bootstrap identity that is no longer configured");
        return Err(AuthError::TokenInvalid);
    }
    Ok(())
}

/// Refresh token use case
///
/// Reissues an access token from a still-valid one, with roles and
/// permissions re-read from the store and the same "Remember Me" window.
pub struct RefreshTokenUseCase<R>
where
    R: AccountRepository + RoleRepository + Sync,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    tokens: Arc<TokenIssuer>,
}

impl<R> RefreshTokenUseCase<R>
where
    R: AccountRepository + RoleRepository + Sync,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            config,
            tokens,
        }
    }

    pub async fn execute(&self, token: &str) -> AuthResult<LoginOutput> {
        let verified = self.tokens.verify_access(token)?;
        ensure_bootstrap_configured(&self.config, &verified.claims)?;

        if verified.claims.is_bootstrap() {
            let claims = verified.claims;
            let token = self.tokens.issue(
                &claims,
                TokenPurpose::Access,
                self.config.super_admin_token_ttl,
                false,
            )?;
            return Ok(LoginOutput {
                token,
                claims,
                account: None,
            });
        }

        let account = current_account(self.repo.as_ref(), &verified.claims).await?;
        if !account.can_login() {
            return Err(AuthError::AccountNotActive);
        }

        let claims = resolve_claims(self.repo.as_ref(), &account).await?;
        let token = self.tokens.issue_access(&claims, verified.remember_me)?;
        tracing::debug!(account_id = %account.account_id, "Access token refreshed");

        Ok(LoginOutput {
            token,
            claims,
            account: Some(account),
        })
    }
}

/// Account behind an access token's claims
pub async fn current_account<R>(repo: &R, claims: &Claims) -> AuthResult<Account>
where
    R: AccountRepository + Sync,
{
    let account_id = claims.account_id().ok_or(AuthError::NotFound("Account"))?;
    repo.find_by_id(&account_id)
        .await?
        .ok_or(AuthError::NotFound("Account"))
}

/// Claims of an account, permissions resolved from the stored roles
pub(crate) async fn resolve_claims<R>(repo: &R, account: &Account) -> AuthResult<Claims>
where
    R: RoleRepository + Sync,
{
    let roles = RoleRepository::list(repo).await?;
    Ok(role_resolver::claims_for(account, &roles))
}
