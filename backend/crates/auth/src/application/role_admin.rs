//! Role Administration Use Case
//!
//! Listing is open to admins; creating, updating and deleting roles is
//! reserved to super admins. System roles are immutable, so permissions are
//! granted through custom roles.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::entity::Role;
use crate::domain::repository::{PermissionRepository, RoleRepository};
use crate::domain::value_object::{Claims, PermissionName, RoleName};
use crate::error::{AuthError, AuthResult};

/// Role creation input
pub struct CreateRoleInput {
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
    /// Names of existing permissions to grant
    pub permissions: Vec<String>,
}

/// Role update input. `None` leaves a field unchanged.
pub struct UpdateRoleInput {
    pub description: Option<String>,
    pub level: Option<i32>,
    /// Replaces the granted permissions
    pub permissions: Option<Vec<String>>,
}

/// Role administration use case
pub struct RoleAdminUseCase<R>
where
    R: RoleRepository + PermissionRepository + Sync,
{
    repo: Arc<R>,
}

impl<R> RoleAdminUseCase<R>
where
    R: RoleRepository + PermissionRepository + Sync,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, caller: &Claims) -> AuthResult<Vec<Role>> {
        caller.require_admin()?;
        self.repo.list().await
    }

    pub async fn create(&self, caller: &Claims, input: CreateRoleInput) -> AuthResult<Role> {
        caller.require_super_admin()?;
        let name = RoleName::new(&input.name)?;
        if self.repo.find_by_name(&name).await?.is_some() {
            return Err(AuthError::Conflict(format!("Role `{}` already exists", name)));
        }

        let permissions = self.resolve_permissions(&input.permissions).await?;
        let now = Utc::now();
        let mut role = Role::new(name, input.description, input.level, now)?;
        role.set_permissions(permissions, now)?;
        self.repo.create(&role).await?;
        tracing::info!(role = %role.name, by = %caller.subject, "Role created");
        Ok(role)
    }

    pub async fn update(
        &self,
        caller: &Claims,
        name: &str,
        input: UpdateRoleInput,
    ) -> AuthResult<Role> {
        caller.require_super_admin()?;
        let mut role = self.load(name).await?;
        let now = Utc::now();
        role.update(input.description, input.level, now)?;
        if let Some(names) = &input.permissions {
            let permissions = self.resolve_permissions(names).await?;
            role.set_permissions(permissions, now)?;
        }
        self.repo.update(&role).await?;
        tracing::info!(role = %role.name, by = %caller.subject, "Role updated");
        Ok(role)
    }

    /// Refused for system roles and for roles still assigned to accounts
    pub async fn delete(&self, caller: &Claims, name: &str) -> AuthResult<()> {
        caller.require_super_admin()?;
        let role = self.load(name).await?;
        role.ensure_mutable()?;

        let members = self.repo.count_members(&role.name).await?;
        if members > 0 {
            return Err(AuthError::Conflict(format!(
                "Role `{}` is assigned to {} account(s)",
                role.name, members
            )));
        }

        self.repo.delete(&role.name).await?;
        tracing::info!(role = %role.name, by = %caller.subject, "Role deleted");
        Ok(())
    }

    /// Names must all exist; nothing is granted otherwise
    async fn resolve_permissions(&self, names: &[String]) -> AuthResult<BTreeSet<PermissionName>> {
        let names = names
            .iter()
            .map(PermissionName::new)
            .collect::<AuthResult<BTreeSet<_>>>()?;
        for name in &names {
            if self.repo.find_permission(name).await?.is_none() {
                return Err(AuthError::NotFound("Permission"));
            }
        }
        Ok(names)
    }

    async fn load(&self, name: &str) -> AuthResult<Role> {
        let name = RoleName::new(name)?;
        self.repo
            .find_by_name(&name)
            .await?
            .ok_or(AuthError::NotFound("Role"))
    }
}
