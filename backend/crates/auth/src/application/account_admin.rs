//! Account Administration Use Cases
//!
//! All operations take the caller's verified claims. Admins manage regular
//! accounts; only super admins may touch `super_admin` memberships or
//! accounts holding that role.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use crate::application::audit::record_event;
use crate::application::config::AuthConfig;
use crate::domain::entity::{Account, AuthEvent, AuthEventKind, Role};
use crate::domain::repository::{AccountRepository, AuthEventRepository, RoleRepository};
use crate::domain::service::LockoutGuard;
use crate::domain::value_object::{AccountId, AccountStatus, Claims, RoleName};
use crate::error::{AuthError, AuthResult};

/// Account administration use case
pub struct AccountAdminUseCase<R>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> AccountAdminUseCase<R>
where
    R: AccountRepository + RoleRepository + AuthEventRepository + Sync,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Clears the lockout regardless of elapsed time
    pub async fn force_unlock(&self, caller: &Claims, account_id: &AccountId) -> AuthResult<()> {
        caller.require_admin()?;
        let guard = LockoutGuard::new(self.config.lockout);

        let (account, _) = self
            .repo
            .modify(account_id, move |acc| guard.force_unlock(&mut acc.lockout))
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        self.audit(AuthEventKind::AccountUnlocked, &account).await?;
        tracing::info!(
            account_id = %account.account_id,
            by = %caller.subject,
            "Account unlocked by administrator"
        );
        Ok(())
    }

    pub async fn set_status(
        &self,
        caller: &Claims,
        account_id: &AccountId,
        status: AccountStatus,
    ) -> AuthResult<Account> {
        caller.require_admin()?;
        if caller.account_id().as_ref() == Some(account_id) {
            return Err(AuthError::validation(
                "status",
                "Administrators cannot change their own status",
            ));
        }
        let target = self.load(account_id).await?;
        Self::ensure_can_manage(caller, &target)?;

        let now = Utc::now();
        let (account, _) = self
            .repo
            .modify(account_id, move |acc| acc.set_status(status, now))
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        self.audit(AuthEventKind::StatusChanged, &account).await?;
        tracing::info!(
            account_id = %account.account_id,
            status = %status,
            by = %caller.subject,
            "Account status changed"
        );
        Ok(account)
    }

    /// Replaces the role memberships. Names are resolved to existing roles
    /// once, before anything is written.
    pub async fn assign_roles(
        &self,
        caller: &Claims,
        account_id: &AccountId,
        role_names: &[String],
    ) -> AuthResult<Account> {
        caller.require_admin()?;
        let target = self.load(account_id).await?;
        Self::ensure_can_manage(caller, &target)?;

        let roles = self.resolve_roles(role_names).await?;
        if !caller.is_super_admin && roles.iter().any(|r| r.name.as_str() == RoleName::SUPER_ADMIN)
        {
            return Err(AuthError::Forbidden);
        }

        let now = Utc::now();
        let (account, _) = self
            .repo
            .modify(account_id, move |acc| acc.replace_roles(&roles, now))
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        self.audit(AuthEventKind::RolesChanged, &account).await?;
        tracing::info!(
            account_id = %account.account_id,
            roles = ?account.roles,
            by = %caller.subject,
            "Account roles replaced"
        );
        Ok(account)
    }

    /// Most recent auth events of an account. Admins or the account itself.
    pub async fn login_history(
        &self,
        caller: &Claims,
        account_id: &AccountId,
        limit: Option<u32>,
    ) -> AuthResult<Vec<AuthEvent>> {
        if caller.account_id().as_ref() != Some(account_id) {
            caller.require_admin()?;
        }
        let limit = limit
            .unwrap_or(self.config.login_history_limit)
            .clamp(1, self.config.login_history_limit);
        self.repo.list_for_account(account_id, limit).await
    }

    async fn load(&self, account_id: &AccountId) -> AuthResult<Account> {
        self.repo
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::NotFound("Account"))
    }

    async fn resolve_roles(&self, role_names: &[String]) -> AuthResult<Vec<Role>> {
        let names = role_names
            .iter()
            .map(RoleName::new)
            .collect::<AuthResult<BTreeSet<_>>>()?;

        let mut roles = Vec::with_capacity(names.len());
        for name in &names {
            let role = RoleRepository::find_by_name(self.repo.as_ref(), name)
                .await?
                .ok_or(AuthError::NotFound("Role"))?;
            roles.push(role);
        }
        Ok(roles)
    }

    fn ensure_can_manage(caller: &Claims, target: &Account) -> AuthResult<()> {
        if !caller.is_super_admin && target.has_role(RoleName::SUPER_ADMIN) {
            return Err(AuthError::Forbidden);
        }
        Ok(())
    }

    async fn audit(&self, kind: AuthEventKind, account: &Account) -> AuthResult<()> {
        record_event(
            self.repo.as_ref(),
            kind,
            Some(account.account_id),
            account.email.as_str(),
            None,
        )
        .await
    }
}
