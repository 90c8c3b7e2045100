//! Identity Claims
//!
//! What a verified bearer token says about its holder. Downstream
//! authorization checks work only from these flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::value_object::{AccountId, PermissionName, RoleName};
use crate::error::{AuthError, AuthResult};

/// Subject used by the configured bootstrap super-administrator
pub const SUPER_ADMIN_SUBJECT: &str = "super_admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Account id, or [`SUPER_ADMIN_SUBJECT`]
    pub subject: String,
    pub email: String,
    pub roles: BTreeSet<RoleName>,
    /// Union of the permissions granted by `roles`
    #[serde(default)]
    pub permissions: BTreeSet<PermissionName>,
    pub is_admin: bool,
    pub is_super_admin: bool,
}

impl Claims {
    /// Account the claims belong to. `None` for the bootstrap identity.
    pub fn account_id(&self) -> Option<AccountId> {
        self.subject.parse().ok()
    }

    /// True for the configured bootstrap super-administrator
    pub fn is_bootstrap(&self) -> bool {
        self.subject == SUPER_ADMIN_SUBJECT
    }

    pub fn require_admin(&self) -> AuthResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    pub fn require_super_admin(&self) -> AuthResult<()> {
        if self.is_super_admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Super admins hold every permission
    pub fn has_permission(&self, name: &str) -> bool {
        self.is_super_admin || self.permissions.iter().any(|p| p.as_str() == name)
    }

    /// Passes when any one of `names` is held
    pub fn require_permission(&self, names: &[&str]) -> AuthResult<()> {
        if names.iter().any(|name| self.has_permission(name)) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}
