//! Role Entity

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::value_object::{PermissionName, RoleName};
use crate::error::{AuthError, AuthResult};

pub const ROLE_DESCRIPTION_MAX_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: RoleName,
    pub description: Option<String>,
    /// Seeded roles; never mutated or deleted through the admin surface
    pub is_system_role: bool,
    /// Informational rank
    pub level: i32,
    pub permissions: BTreeSet<PermissionName>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Administrator-defined role
    pub fn new(
        name: RoleName,
        description: Option<String>,
        level: i32,
        now: DateTime<Utc>,
    ) -> AuthResult<Self> {
        Ok(Self {
            name,
            description: normalize_description(description)?,
            is_system_role: false,
            level,
            permissions: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Seed roles: `user` (1), `admin` (100), `super_admin` (1000)
    pub fn system_defaults(now: DateTime<Utc>) -> Vec<Self> {
        [
            (RoleName::user(), "Default role for registered accounts", 1),
            (RoleName::admin(), "Administrator", 100),
            (RoleName::super_admin(), "Super administrator", 1000),
        ]
        .into_iter()
        .map(|(name, description, level)| Self {
            name,
            description: Some(description.to_string()),
            is_system_role: true,
            level,
            permissions: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        })
        .collect()
    }

    pub fn ensure_mutable(&self) -> AuthResult<()> {
        if self.is_system_role {
            Err(AuthError::SystemRoleProtected)
        } else {
            Ok(())
        }
    }

    pub fn update(
        &mut self,
        description: Option<String>,
        level: Option<i32>,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        self.ensure_mutable()?;
        if description.is_some() {
            self.description = normalize_description(description)?;
        }
        if let Some(level) = level {
            self.level = level;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Replace the granted permissions (already resolved to existing ones)
    pub fn set_permissions(
        &mut self,
        permissions: BTreeSet<PermissionName>,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        self.ensure_mutable()?;
        self.permissions = permissions;
        self.updated_at = now;
        Ok(())
    }
}

/// Trimmed, blank-as-absent description of at most
/// [`ROLE_DESCRIPTION_MAX_LENGTH`] characters
pub(crate) fn normalize_description(description: Option<String>) -> AuthResult<Option<String>> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > ROLE_DESCRIPTION_MAX_LENGTH)
    {
        return Err(AuthError::validation(
            "description",
            format!(
                "Description must be at most {} characters",
                ROLE_DESCRIPTION_MAX_LENGTH
            ),
        ));
    }
    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_defaults() {
        let roles = Role::system_defaults(Utc::now());
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["user", "admin", "super_admin"]);
        assert!(roles.iter().all(|r| r.is_system_role));
        assert_eq!(roles[2].level, 1000);
    }

    #[test]
    fn test_system_role_is_immutable() {
        let mut admin = Role::system_defaults(Utc::now()).remove(1);
        assert!(matches!(
            admin.update(Some("hijacked".into()), None, Utc::now()),
            Err(AuthError::SystemRoleProtected)
        ));
        assert_eq!(admin.description.as_deref(), Some("Administrator"));
    }

    #[test]
    fn test_custom_role_update() {
        let mut role =
            Role::new(RoleName::new("editor").unwrap(), None, 10, Utc::now()).unwrap();
        role.update(Some("  Edits content ".into()), Some(20), Utc::now())
            .unwrap();
        assert_eq!(role.description.as_deref(), Some("Edits content"));
        assert_eq!(role.level, 20);
    }

    #[test]
    fn test_permissions_only_on_custom_roles() {
        let grant = BTreeSet::from([PermissionName::new("posts:write").unwrap()]);

        let mut editor =
            Role::new(RoleName::new("editor").unwrap(), None, 10, Utc::now()).unwrap();
        editor.set_permissions(grant.clone(), Utc::now()).unwrap();
        assert_eq!(editor.permissions, grant);

        let mut user = Role::system_defaults(Utc::now()).remove(0);
        assert!(matches!(
            user.set_permissions(grant, Utc::now()),
            Err(AuthError::SystemRoleProtected)
        ));
        assert!(user.permissions.is_empty());
    }
}
