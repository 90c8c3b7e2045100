//! Permission Administration Use Case
//!
//! Same split as roles: admins list, super admins create, update and delete.
//! Names and `(module, action)` pairs are unique. A permission still granted
//! by a role cannot be deleted.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::entity::Permission;
use crate::domain::repository::PermissionRepository;
use crate::domain::value_object::{Claims, PermissionName};
use crate::error::{AuthError, AuthResult};

/// Permission creation input
pub struct CreatePermissionInput {
    pub name: String,
    pub description: Option<String>,
    pub module: String,
    pub action: String,
}

/// Permission update input. `None` leaves a field unchanged.
pub struct UpdatePermissionInput {
    pub description: Option<String>,
    pub module: Option<String>,
    pub action: Option<String>,
}

pub struct PermissionAdminUseCase<R>
where
    R: PermissionRepository + Sync,
{
    repo: Arc<R>,
}

impl<R> PermissionAdminUseCase<R>
where
    R: PermissionRepository + Sync,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// All permissions, or those of one module
    pub async fn list(&self, caller: &Claims, module: Option<&str>) -> AuthResult<Vec<Permission>> {
        caller.require_admin()?;
        let module = module.map(|m| m.trim().to_lowercase());
        let permissions = self.repo.list_permissions().await?;
        Ok(match module {
            Some(module) => permissions
                .into_iter()
                .filter(|p| p.module == module)
                .collect(),
            None => permissions,
        })
    }

    pub async fn create(
        &self,
        caller: &Claims,
        input: CreatePermissionInput,
    ) -> AuthResult<Permission> {
        caller.require_super_admin()?;
        let name = PermissionName::new(&input.name)?;
        let permission = Permission::new(
            name,
            input.description,
            &input.module,
            &input.action,
            Utc::now(),
        )?;
        self.ensure_unique(&permission, true).await?;

        self.repo.create_permission(&permission).await?;
        tracing::info!(permission = %permission.name, by = %caller.subject, "Permission created");
        Ok(permission)
    }

    pub async fn update(
        &self,
        caller: &Claims,
        name: &str,
        input: UpdatePermissionInput,
    ) -> AuthResult<Permission> {
        caller.require_super_admin()?;
        let mut permission = self.load(name).await?;
        permission.update(
            input.description,
            input.module.as_deref(),
            input.action.as_deref(),
            Utc::now(),
        )?;
        self.ensure_unique(&permission, false).await?;

        self.repo.update_permission(&permission).await?;
        tracing::info!(permission = %permission.name, by = %caller.subject, "Permission updated");
        Ok(permission)
    }

    /// Refused while any role grants the permission
    pub async fn delete(&self, caller: &Claims, name: &str) -> AuthResult<()> {
        caller.require_super_admin()?;
        let permission = self.load(name).await?;

        let roles = self.repo.count_permission_roles(&permission.name).await?;
        if roles > 0 {
            return Err(AuthError::Conflict(format!(
                "Permission `{}` is granted by {} role(s)",
                permission.name, roles
            )));
        }

        self.repo.delete_permission(&permission.name).await?;
        tracing::info!(permission = %permission.name, by = %caller.subject, "Permission deleted");
        Ok(())
    }

    /// `is_new` also rejects a taken name
    async fn ensure_unique(&self, permission: &Permission, is_new: bool) -> AuthResult<()> {
        let existing = self.repo.list_permissions().await?;
        if is_new && existing.iter().any(|p| p.name == permission.name) {
            return Err(AuthError::Conflict(format!(
                "Permission `{}` already exists",
                permission.name
            )));
        }
        if existing
            .iter()
            .any(|p| p.name != permission.name && p.same_scope(permission))
        {
            return Err(AuthError::Conflict(format!(
                "A permission for `{}:{}` already exists",
                permission.module, permission.action
            )));
        }
        Ok(())
    }

    async fn load(&self, name: &str) -> AuthResult<Permission> {
        let name = PermissionName::new(name)?;
        self.repo
            .find_permission(&name)
            .await?
            .ok_or(AuthError::NotFound("Permission"))
    }
}
