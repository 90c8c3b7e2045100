//! Role Resolver
//!
//! Derives authorization flags and permissions from role memberships.

use std::collections::BTreeSet;

use crate::domain::entity::{Role, account::Account};
use crate::domain::value_object::{Claims, PermissionName, RoleName, claims::SUPER_ADMIN_SUBJECT};

pub fn roles_of(account: &Account) -> BTreeSet<RoleName> {
    account.roles.clone()
}

/// `admin` or `super_admin`
pub fn is_admin(roles: &BTreeSet<RoleName>) -> bool {
    roles
        .iter()
        .any(|r| r.as_str() == RoleName::ADMIN || r.as_str() == RoleName::SUPER_ADMIN)
}

pub fn is_super_admin(roles: &BTreeSet<RoleName>) -> bool {
    roles.iter().any(|r| r.as_str() == RoleName::SUPER_ADMIN)
}

/// Permissions granted by the roles the account holds. `roles` may contain
/// any superset of the account's roles.
pub fn permissions_of(account: &Account, roles: &[Role]) -> BTreeSet<PermissionName> {
    roles
        .iter()
        .filter(|role| account.roles.contains(&role.name))
        .flat_map(|role| role.permissions.iter().cloned())
        .collect()
}

pub fn claims_for(account: &Account, roles: &[Role]) -> Claims {
    let permissions = permissions_of(account, roles);
    let roles = roles_of(account);
    Claims {
        subject: account.account_id.to_string(),
        email: account.email.as_str().to_string(),
        permissions,
        is_admin: is_admin(&roles),
        is_super_admin: is_super_admin(&roles),
        roles,
    }
}

/// Fixed claims of the configured bootstrap super-administrator
pub fn bootstrap_claims(email: &str) -> Claims {
    Claims {
        subject: SUPER_ADMIN_SUBJECT.to_string(),
        email: email.to_string(),
        roles: BTreeSet::from([RoleName::super_admin()]),
        permissions: BTreeSet::new(),
        is_admin: true,
        is_super_admin: true,
    }
}
