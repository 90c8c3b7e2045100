//! Super Admin Login Use Case
//!
//! 設定で注入されたブートストラップ管理者専用のログイン。
//! ストア・ロックアウト・ロール解決を一切通らず、固定クレームを発行する。

use std::sync::Arc;

use crate::application::audit::record_event;
use crate::application::config::AuthConfig;
use crate::application::login::LoginOutput;
use crate::application::token::{TokenIssuer, TokenPurpose};
use crate::domain::entity::AuthEventKind;
use crate::domain::repository::AuthEventRepository;
use crate::domain::service::role_resolver;
use crate::domain::value_object::{Email, RawPassword};
use crate::error::{AuthError, AuthResult};

/// Super admin login input
pub struct SuperAdminLoginInput {
    pub email: String,
    pub password: String,
    pub ip_address: Option<String>,
}

/// Super admin login use case
pub struct SuperAdminLoginUseCase<R>
where
    R: AuthEventRepository + Sync,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    tokens: Arc<TokenIssuer>,
}

impl<R> SuperAdminLoginUseCase<R>
where
    R: AuthEventRepository + Sync,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            config,
            tokens,
        }
    }

    /// True if `email` names the configured bootstrap identity
    pub fn matches(config: &AuthConfig, email: &Email) -> bool {
        config
            .super_admin
            .as_ref()
            .is_some_and(|sa| &sa.email == email)
    }

    pub async fn execute(&self, input: SuperAdminLoginInput) -> AuthResult<LoginOutput> {
        let email = Email::new(&input.email)?;
        let password = RawPassword::new(input.password)?;
        self.authenticate(&email, &password, input.ip_address.as_deref())
            .await
    }

    pub(crate) async fn authenticate(
        &self,
        email: &Email,
        password: &RawPassword,
        ip_address: Option<&str>,
    ) -> AuthResult<LoginOutput> {
        let Some(super_admin) = self.config.super_admin.as_ref() else {
            return Err(AuthError::InvalidCredentials {
                attempts_left: None,
            });
        };

        if &super_admin.email != email
            || !super_admin.password_hash.verify(password, &self.config.argon2)
        {
            tracing::warn!(ip = ?ip_address, "Rejected super admin login");
            return Err(AuthError::InvalidCredentials {
                attempts_left: None,
            });
        }

        let claims = role_resolver::bootstrap_claims(super_admin.email.as_str());
        let token = self.tokens.issue(
            &claims,
            TokenPurpose::Access,
            self.config.super_admin_token_ttl,
            false,
        )?;

        record_event(
            self.repo.as_ref(),
            AuthEventKind::SuperAdminLogin,
            None,
            email.as_str(),
            ip_address,
        )
        .await?;
        tracing::info!(ip = ?ip_address, "Super admin signed in");

        Ok(LoginOutput {
            token,
            claims,
            account: None,
        })
    }
}
