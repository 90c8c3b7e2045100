//! Authentication Service
//!
//! Facade over the use cases. Cheap to clone; every clone shares the same
//! store, notifier, configuration and signing key.

use std::sync::Arc;

use crate::application::account_admin::AccountAdminUseCase;
use crate::application::change_password::{ChangePasswordInput, ChangePasswordUseCase};
use crate::application::config::AuthConfig;
use crate::application::external_login::{ExternalLoginInput, ExternalLoginUseCase};
use crate::application::login::{LoginInput, LoginOutput, LoginUseCase};
use crate::application::notifier::Notifier;
use crate::application::password_reset::{
    RequestPasswordResetUseCase, ResetPasswordInput, ResetPasswordUseCase,
};
use crate::application::permission_admin::{
    CreatePermissionInput, PermissionAdminUseCase, UpdatePermissionInput,
};
use crate::application::profile::{UpdateProfileInput, UpdateProfileUseCase};
use crate::application::register::{RegisterInput, RegisterOutput, RegisterUseCase};
use crate::application::role_admin::{CreateRoleInput, RoleAdminUseCase, UpdateRoleInput};
use crate::application::session::{self, RefreshTokenUseCase};
use crate::application::super_admin_login::{SuperAdminLoginInput, SuperAdminLoginUseCase};
use crate::application::token::TokenIssuer;
use crate::application::verify_email::{
    ResendVerificationUseCase, VerifyEmailOutcome, VerifyEmailUseCase,
};
use crate::domain::entity::{Account, AuthEvent, Permission, Role};
use crate::domain::repository::{
    AccountRepository, AuthEventRepository, PermissionRepository, RoleRepository,
};
use crate::domain::value_object::{AccountId, AccountStatus, Claims, PasswordHash};
use crate::error::AuthResult;

/// Everything the service needs from persistence
pub trait AuthStore:
    AccountRepository
    + RoleRepository
    + PermissionRepository
    + AuthEventRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: AccountRepository
        + RoleRepository
        + PermissionRepository
        + AuthEventRepository
        + Send
        + Sync
        + 'static
{
}

pub struct AuthService<R, N>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    repo: Arc<R>,
    notifier: Arc<N>,
    config: Arc<AuthConfig>,
    tokens: Arc<TokenIssuer>,
    decoy_hash: Arc<PasswordHash>,
}

impl<R, N> Clone for AuthService<R, N>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            notifier: self.notifier.clone(),
            config: self.config.clone(),
            tokens: self.tokens.clone(),
            decoy_hash: self.decoy_hash.clone(),
        }
    }
}

impl<R, N> AuthService<R, N>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    /// Fails if the token secret cannot be used as a signing key or the
    /// login decoy hash cannot be computed
    pub fn new(repo: R, notifier: N, config: AuthConfig) -> AuthResult<Self> {
        let tokens = TokenIssuer::new(&config)?;
        let decoy_hash = PasswordHash::unguessable(&config.argon2)?;
        Ok(Self {
            repo: Arc::new(repo),
            notifier: Arc::new(notifier),
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            decoy_hash: Arc::new(decoy_hash),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    pub async fn register(&self, input: RegisterInput) -> AuthResult<RegisterOutput> {
        RegisterUseCase::new(
            self.repo.clone(),
            self.notifier.clone(),
            self.config.clone(),
            self.tokens.clone(),
        )
        .execute(input)
        .await
    }

    pub async fn login(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        LoginUseCase::new(
            self.repo.clone(),
            self.config.clone(),
            self.tokens.clone(),
            self.decoy_hash.clone(),
        )
        .execute(input)
        .await
    }

    pub async fn super_admin_login(&self, input: SuperAdminLoginInput) -> AuthResult<LoginOutput> {
        SuperAdminLoginUseCase::new(self.repo.clone(), self.config.clone(), self.tokens.clone())
            .execute(input)
            .await
    }

    pub async fn external_login(&self, input: ExternalLoginInput) -> AuthResult<LoginOutput> {
        ExternalLoginUseCase::new(self.repo.clone(), self.config.clone(), self.tokens.clone())
            .execute(input)
            .await
    }

    pub async fn change_password(&self, input: ChangePasswordInput) -> AuthResult<()> {
        ChangePasswordUseCase::new(self.repo.clone(), self.config.clone())
            .execute(input)
            .await
    }

    pub async fn update_profile(&self, input: UpdateProfileInput) -> AuthResult<Account> {
        UpdateProfileUseCase::new(self.repo.clone())
            .execute(input)
            .await
    }

    pub async fn request_password_reset(
        &self,
        email: &str,
        ip_address: Option<&str>,
    ) -> AuthResult<()> {
        RequestPasswordResetUseCase::new(
            self.repo.clone(),
            self.notifier.clone(),
            self.tokens.clone(),
        )
        .execute(email, ip_address)
        .await
    }

    pub async fn reset_password(&self, input: ResetPasswordInput) -> AuthResult<()> {
        ResetPasswordUseCase::new(self.repo.clone(), self.config.clone(), self.tokens.clone())
            .execute(input)
            .await
    }

    pub async fn verify_email(&self, token: &str) -> AuthResult<VerifyEmailOutcome> {
        VerifyEmailUseCase::new(self.repo.clone(), self.tokens.clone())
            .execute(token)
            .await
    }

    pub async fn resend_verification(&self, email: &str) -> AuthResult<()> {
        ResendVerificationUseCase::new(
            self.repo.clone(),
            self.notifier.clone(),
            self.tokens.clone(),
        )
        .execute(email)
        .await
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    pub fn authorize(&self, token: &str) -> AuthResult<Claims> {
        session::authorize(&self.config, &self.tokens, token)
    }

    pub async fn refresh(&self, token: &str) -> AuthResult<LoginOutput> {
        RefreshTokenUseCase::new(self.repo.clone(), self.config.clone(), self.tokens.clone())
            .execute(token)
            .await
    }

    pub async fn current_account(&self, claims: &Claims) -> AuthResult<Account> {
        session::current_account(self.repo.as_ref(), claims).await
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    fn account_admin(&self) -> AccountAdminUseCase<R> {
        AccountAdminUseCase::new(self.repo.clone(), self.config.clone())
    }

    fn role_admin(&self) -> RoleAdminUseCase<R> {
        RoleAdminUseCase::new(self.repo.clone())
    }

    fn permission_admin(&self) -> PermissionAdminUseCase<R> {
        PermissionAdminUseCase::new(self.repo.clone())
    }

    pub async fn force_unlock(&self, caller: &Claims, account_id: &AccountId) -> AuthResult<()> {
        self.account_admin().force_unlock(caller, account_id).await
    }

    pub async fn set_status(
        &self,
        caller: &Claims,
        account_id: &AccountId,
        status: AccountStatus,
    ) -> AuthResult<Account> {
        self.account_admin()
            .set_status(caller, account_id, status)
            .await
    }

    pub async fn assign_roles(
        &self,
        caller: &Claims,
        account_id: &AccountId,
        role_names: &[String],
    ) -> AuthResult<Account> {
        self.account_admin()
            .assign_roles(caller, account_id, role_names)
            .await
    }

    pub async fn login_history(
        &self,
        caller: &Claims,
        account_id: &AccountId,
        limit: Option<u32>,
    ) -> AuthResult<Vec<AuthEvent>> {
        self.account_admin()
            .login_history(caller, account_id, limit)
            .await
    }

    pub async fn list_roles(&self, caller: &Claims) -> AuthResult<Vec<Role>> {
        self.role_admin().list(caller).await
    }

    pub async fn create_role(&self, caller: &Claims, input: CreateRoleInput) -> AuthResult<Role> {
        self.role_admin().create(caller, input).await
    }

    pub async fn update_role(
        &self,
        caller: &Claims,
        name: &str,
        input: UpdateRoleInput,
    ) -> AuthResult<Role> {
        self.role_admin().update(caller, name, input).await
    }

    pub async fn delete_role(&self, caller: &Claims, name: &str) -> AuthResult<()> {
        self.role_admin().delete(caller, name).await
    }

    pub async fn list_permissions(
        &self,
        caller: &Claims,
        module: Option<&str>,
    ) -> AuthResult<Vec<Permission>> {
        self.permission_admin().list(caller, module).await
    }

    pub async fn create_permission(
        &self,
        caller: &Claims,
        input: CreatePermissionInput,
    ) -> AuthResult<Permission> {
        self.permission_admin().create(caller, input).await
    }

    pub async fn update_permission(
        &self,
        caller: &Claims,
        name: &str,
        input: UpdatePermissionInput,
    ) -> AuthResult<Permission> {
        self.permission_admin().update(caller, name, input).await
    }

    pub async fn delete_permission(&self, caller: &Claims, name: &str) -> AuthResult<()> {
        self.permission_admin().delete(caller, name).await
    }
}
